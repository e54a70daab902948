use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};

/// Whether `path` is read and written gzip compressed.
pub fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "gz")
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, std::io::Error> {
    let file = File::open(path)?;
    let mut buffer = Vec::new();

    if is_compressed(path) {
        GzDecoder::new(BufReader::new(file)).read_to_end(&mut buffer)?;
    } else {
        BufReader::new(file).read_to_end(&mut buffer)?;
    }

    Ok(buffer)
}

pub fn read_string(path: &Path) -> Result<String, std::io::Error> {
    let bytes = read_bytes(path)?;
    String::from_utf8(bytes)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}

pub fn write_bytes(bytes: &[u8], path: &Path) -> Result<(), std::io::Error> {
    let writer = BufWriter::new(File::create(path)?);

    if is_compressed(path) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        encoder.write_all(bytes)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        writer.write_all(bytes)?;
        writer.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_round_trip() {
        let path = std::env::temp_dir().join(format!("charon-storage-{}.txt.gz", std::process::id()));

        write_bytes(b"Duties: []\n", &path).unwrap();
        let raw = std::fs::read(&path).unwrap();
        let content = read_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert_eq!(content, "Duties: []\n");
    }
}
