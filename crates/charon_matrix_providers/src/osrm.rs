use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::travel_matrices::TravelMatrices;

#[derive(Debug, Error)]
pub enum OsrmError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OSRM responded with {code}: {message}")]
    Api { code: String, message: String },

    #[error("Incomplete response")]
    IncompleteResponse,

    #[error("{quantity} {value} from source {row} to target {column} exceeds {limit}")]
    OutOfRange {
        quantity: &'static str,
        value: f64,
        limit: f64,
        row: usize,
        column: usize,
    },
}

pub struct OsrmMatrixClientParams {
    pub osrm_url: String,
    pub profile: String,

    /// Durations above this value (seconds) reject the whole table
    pub max_duration: f64,
    /// Distances above this value (meters) reject the whole table
    pub max_distance: f64,

    /// Attempts per table request on transport errors
    pub attempts: usize,
}

impl OsrmMatrixClientParams {
    pub fn new(osrm_url: String, profile: String) -> Self {
        Self {
            osrm_url,
            profile,
            max_duration: 100_000.0,
            max_distance: 135_000.0,
            attempts: 3,
        }
    }
}

pub const OSRM_TABLE_API_PATH: &str = "/table/v1/";

/// Delay before the first retry, growing linearly with the attempts.
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Deserialize)]
struct OsrmTableResponse {
    code: String,
    message: Option<String>,
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

pub struct OsrmMatrixClient {
    params: OsrmMatrixClientParams,
    client: reqwest::Client,
}

impl OsrmMatrixClient {
    pub fn new(params: OsrmMatrixClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.params.osrm_url
    }

    fn table_url(&self, sources: &[geo::Point], targets: &[geo::Point]) -> String {
        let mut url = self.params.osrm_url.trim_end_matches('/').to_owned();
        url.push_str(OSRM_TABLE_API_PATH);
        url.push_str(&self.params.profile);
        url.push('/');

        let coordinates = sources
            .iter()
            .chain(targets.iter())
            .map(|point| format!("{},{}", point.x(), point.y()))
            .collect::<Vec<_>>();
        url.push_str(&coordinates.join(";"));

        url
    }

    /// Fetches one table. Missing entries are kept as "no route".
    pub async fn fetch_table(
        &self,
        sources: &[geo::Point],
        targets: &[geo::Point],
    ) -> Result<TravelMatrices, OsrmError> {
        let url = self.table_url(sources, targets);
        let source_indices = (0..sources.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");
        let target_indices = (sources.len()..sources.len() + targets.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");

        let mut attempt = 1;
        let response = loop {
            let result = self
                .client
                .get(&url)
                .query(&[
                    ("sources", source_indices.as_str()),
                    ("destinations", target_indices.as_str()),
                    ("annotations", "duration,distance"),
                ])
                .send()
                .await
                .and_then(|response| response.error_for_status());

            match result {
                Ok(response) => break response.json::<OsrmTableResponse>().await?,
                Err(err) if attempt < self.params.attempts => {
                    warn!(
                        "OSRM request to {} failed (attempt {}): {}",
                        self.params.osrm_url, attempt, err
                    );
                    tokio::time::sleep(RETRY_DELAY * attempt as u32).await;
                    attempt += 1;
                }
                Err(err) => return Err(OsrmError::Request(err)),
            }
        };

        if response.code != "Ok" {
            return Err(OsrmError::Api {
                code: response.code,
                message: response.message.unwrap_or_default(),
            });
        }

        let durations = response.durations.ok_or(OsrmError::IncompleteResponse)?;
        let distances = response.distances.ok_or(OsrmError::IncompleteResponse)?;

        if durations.len() != sources.len() || distances.len() != sources.len() {
            return Err(OsrmError::IncompleteResponse);
        }

        let mut matrices = TravelMatrices::new(sources.len(), targets.len());
        let mut missing = 0;

        for (row, (durations, distances)) in durations.iter().zip(distances.iter()).enumerate() {
            if durations.len() != targets.len() || distances.len() != targets.len() {
                return Err(OsrmError::IncompleteResponse);
            }

            for (column, (duration, distance)) in durations.iter().zip(distances.iter()).enumerate()
            {
                match (duration, distance) {
                    (Some(duration), Some(distance)) => {
                        self.check_range(
                            "duration",
                            *duration,
                            self.params.max_duration,
                            row,
                            column,
                        )?;
                        self.check_range(
                            "distance",
                            *distance,
                            self.params.max_distance,
                            row,
                            column,
                        )?;
                        matrices.set(row, column, *distance, *duration);
                    }
                    _ => missing += 1,
                }
            }
        }

        if missing > 0 {
            debug!("OSRM table has {} pairs without route", missing);
        }

        Ok(matrices)
    }

    fn check_range(
        &self,
        quantity: &'static str,
        value: f64,
        limit: f64,
        row: usize,
        column: usize,
    ) -> Result<(), OsrmError> {
        if value > limit {
            return Err(OsrmError::OutOfRange {
                quantity,
                value,
                limit,
                row,
                column,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        let client = OsrmMatrixClient::new(OsrmMatrixClientParams::new(
            String::from("http://localhost:5000/"),
            String::from("driving"),
        ));

        let url = client.table_url(
            &[geo::Point::new(13.38, 52.51)],
            &[geo::Point::new(13.39, 52.52), geo::Point::new(13.4, 52.53)],
        );

        assert_eq!(
            url,
            "http://localhost:5000/table/v1/driving/13.38,52.51;13.39,52.52;13.4,52.53"
        );
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let client = OsrmMatrixClient::new(OsrmMatrixClientParams::new(
            String::from("http://localhost:5000"),
            String::from("driving"),
        ));

        assert!(client.check_range("duration", 100_000.0, 100_000.0, 0, 0).is_ok());
        assert!(matches!(
            client.check_range("distance", 135_001.0, 135_000.0, 1, 2),
            Err(OsrmError::OutOfRange { row: 1, column: 2, .. })
        ));
    }
}
