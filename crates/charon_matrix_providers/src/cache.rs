use std::{
    hash::{Hash, Hasher},
    io::{BufWriter, Write},
    path::PathBuf,
};

use fxhash::FxHasher64;

use crate::{travel_matrices::TravelMatrices, travel_matrix_provider::TravelMatrixProvider};

const CACHE_FOLDER_ENV_VAR: &str = "CHARON_CACHE_FOLDER";

pub trait MatricesCache {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        sources: &[P],
        targets: &[P],
        matrices: &TravelMatrices,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo::Point>;

    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        sources: &[P],
        targets: &[P],
    ) -> Result<Option<TravelMatrices>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo::Point>;
}

fn hash_points<H, P>(points: &[P], hasher: &mut H)
where
    H: Hasher,
    for<'a> &'a P: Into<geo::Point>,
{
    points.len().hash(hasher);
    for point in points {
        let point = point.into();
        hasher.write_u64(point.x().to_bits());
        hasher.write_u64(point.y().to_bits());
    }
}

fn get_filename<P>(provider: &TravelMatrixProvider, sources: &[P], targets: &[P]) -> String
where
    for<'a> &'a P: Into<geo::Point>,
{
    let mut hasher = FxHasher64::default();

    hash_points(sources, &mut hasher);
    hash_points(targets, &mut hasher);
    provider.hash(&mut hasher);

    let hash = hasher.finish();
    format!("{:016x}.json", hash)
}

/// Stores matrices as JSON files in a folder, keyed by a hash of the points and provider.
/// Without folder the cache is disabled.
pub struct FileCache {
    folder: Option<PathBuf>,
}

impl FileCache {
    pub fn new(folder: PathBuf) -> Self {
        Self {
            folder: Some(folder),
        }
    }

    pub fn disabled() -> Self {
        Self { folder: None }
    }

    fn cache_folder(&self) -> Result<Option<&PathBuf>, anyhow::Error> {
        match &self.folder {
            Some(folder) if !folder.is_dir() => Err(anyhow::anyhow!(
                "Path {} is not a directory",
                folder.display()
            )),
            Some(folder) => Ok(Some(folder)),
            None => Ok(None),
        }
    }
}

impl Default for FileCache {
    fn default() -> Self {
        match std::env::var(CACHE_FOLDER_ENV_VAR) {
            Ok(folder) => Self::new(PathBuf::from(folder)),
            Err(_) => Self::disabled(),
        }
    }
}

impl MatricesCache for FileCache {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        sources: &[P],
        targets: &[P],
        matrices: &TravelMatrices,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo::Point>,
    {
        let Some(cache_folder) = self.cache_folder()? else {
            return Ok(());
        };

        let filename = get_filename(provider, sources, targets);

        let file = std::fs::File::create(cache_folder.join(filename))?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        serde_json::to_writer(&mut writer, &matrices)?;
        writer.flush()?;

        Ok(())
    }

    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        sources: &[P],
        targets: &[P],
    ) -> Result<Option<TravelMatrices>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo::Point>,
    {
        let Some(cache_folder) = self.cache_folder()? else {
            return Ok(None);
        };

        let file_path = cache_folder.join(get_filename(provider, sources, targets));

        if !file_path.is_file() {
            return Ok(None);
        }

        let file = std::fs::File::open(file_path)?;
        let matrices: TravelMatrices = serde_json::from_reader(std::io::BufReader::new(file))?;

        Ok(Some(matrices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Coordinates(f64, f64);

    impl From<&Coordinates> for geo::Point {
        fn from(value: &Coordinates) -> Self {
            geo::Point::new(value.0, value.1)
        }
    }

    #[test]
    fn test_filename_depends_on_direction() {
        let a = vec![Coordinates(0.0, 0.0)];
        let b = vec![Coordinates(1.0, 0.0)];
        let provider = TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 50.0 };

        assert_ne!(
            get_filename(&provider, &a, &b),
            get_filename(&provider, &b, &a)
        );
        assert_eq!(
            get_filename(&provider, &a, &b),
            get_filename(&provider, &a, &b)
        );
    }

    #[test]
    fn test_disabled_cache_is_noop() {
        let cache = FileCache::disabled();
        let points = vec![Coordinates(0.0, 0.0)];
        let provider = TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 50.0 };

        cache
            .cache(&provider, &points, &points, &TravelMatrices::new(1, 1))
            .unwrap();
        assert!(cache.get_cached(&provider, &points, &points).unwrap().is_none());
    }
}
