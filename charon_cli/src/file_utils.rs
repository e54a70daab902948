use std::path::{Path, PathBuf};

pub fn read_folder(folder_path: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder_path)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            files.extend(read_folder(&path)?);
        }
    }

    files.sort();

    Ok(files)
}

fn is_instance_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".json") || name.ends_with(".json.gz"))
        .unwrap_or(false)
}

/// The file itself, or every JSON file below the folder.
pub fn instance_paths(input: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = read_folder(input)?;
    files.retain(|path| is_instance_file(path));

    Ok(files)
}

/// `folder/name.json` becomes `folder/name.{suffix}`, keeping a `.gz` extension.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("instance");
    let (stem, compressed) = match name.strip_suffix(".gz") {
        Some(stem) => (stem, true),
        None => (name, false),
    };
    let stem = stem.strip_suffix(".json").unwrap_or(stem);

    let file_name = if compressed {
        format!("{stem}.{suffix}.gz")
    } else {
        format!("{stem}.{suffix}")
    };

    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn test_read_folder() {
        let current_dir = env::current_dir().unwrap();
        let folder_path = current_dir.join("tests/fixtures/read_folder");
        let files = read_folder(&folder_path).unwrap();

        assert_eq!(
            files,
            vec![
                current_dir.join("tests/fixtures/read_folder/file1.json"),
                current_dir.join("tests/fixtures/read_folder/subfolder1/file2.txt"),
                current_dir.join("tests/fixtures/read_folder/subfolder2/file3.json.gz"),
            ]
        );
    }

    #[test]
    fn test_instance_paths_keep_json_files() {
        let current_dir = env::current_dir().unwrap();
        let files = instance_paths(&current_dir.join("tests/fixtures/read_folder")).unwrap();

        assert_eq!(
            files,
            vec![
                current_dir.join("tests/fixtures/read_folder/file1.json"),
                current_dir.join("tests/fixtures/read_folder/subfolder2/file3.json.gz"),
            ]
        );
    }

    #[test]
    fn test_sibling_path() {
        assert_eq!(
            sibling_path(Path::new("data/day1.json"), "graph.txt"),
            PathBuf::from("data/day1.graph.txt")
        );
        assert_eq!(
            sibling_path(Path::new("data/day1.json.gz"), "graph.json"),
            PathBuf::from("data/day1.graph.json.gz")
        );
    }
}
