use std::path::PathBuf;

use anyhow::Context;
use charon_matrix_providers::{cache::FileCache, travel_matrix_provider::TravelMatrixProvider};
use jiff::SignedDuration;

use crate::parsers;

const OSRM_HOSTS: &str = "CHARON_OSRM_HOSTS";
const OSRM_PROFILE: &str = "CHARON_OSRM_PROFILE";
const MAX_TABLE_SIZE: &str = "CHARON_MAX_TABLE_SIZE";
const OSRM_CONCURRENCY: &str = "CHARON_OSRM_CONCURRENCY";
const CACHE_FOLDER: &str = "CHARON_CACHE_FOLDER";
const SOLVER: &str = "CHARON_SOLVER";
const SOLVER_TIMEOUT: &str = "CHARON_SOLVER_TIMEOUT";
const OTP_URL: &str = "CHARON_OTP_URL";

/// Process settings read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub osrm_hosts: Vec<String>,
    pub osrm_profile: String,
    pub max_table_size: usize,
    pub osrm_concurrency: usize,
    pub cache_folder: Option<PathBuf>,
    pub solver: PathBuf,
    pub solver_timeout: SignedDuration,
    pub otp_url: Option<String>,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid {name}: {value}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let osrm_hosts = var(OSRM_HOSTS)
            .map(|hosts| {
                hosts
                    .split(',')
                    .map(|host| host.trim().to_owned())
                    .filter(|host| !host.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let solver_timeout = match var(SOLVER_TIMEOUT) {
            Some(value) => parsers::parse_duration(&value)
                .map_err(|err| anyhow::anyhow!("Invalid {SOLVER_TIMEOUT}: {err}"))?,
            None => SignedDuration::from_hours(1),
        };

        Ok(Self {
            osrm_hosts,
            osrm_profile: var(OSRM_PROFILE).unwrap_or_else(|| String::from("driving")),
            max_table_size: parse_var(MAX_TABLE_SIZE, 100)?,
            osrm_concurrency: parse_var(OSRM_CONCURRENCY, 4)?,
            cache_folder: var(CACHE_FOLDER).map(PathBuf::from),
            solver: var(SOLVER)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("mosel")),
            solver_timeout,
            otp_url: var(OTP_URL),
        })
    }

    pub fn cache(&self) -> FileCache {
        match &self.cache_folder {
            Some(folder) => FileCache::new(folder.clone()),
            None => FileCache::disabled(),
        }
    }

    /// Straight lines when a speed is given, otherwise OSRM on the configured hosts.
    pub fn matrix_provider(&self, speed_kmh: Option<f64>) -> anyhow::Result<TravelMatrixProvider> {
        if let Some(speed_kmh) = speed_kmh {
            return Ok(TravelMatrixProvider::AsTheCrowFlies { speed_kmh });
        }

        if self.osrm_hosts.is_empty() {
            anyhow::bail!("{OSRM_HOSTS} is not set, pass --speed to use straight-line distances");
        }

        Ok(TravelMatrixProvider::Osrm {
            hosts: self.osrm_hosts.clone(),
            profile: self.osrm_profile.clone(),
            max_table_size: self.max_table_size,
        })
    }
}
