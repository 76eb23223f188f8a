//! Terrain elevation lookups against an Open-Meteo style API.

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use vfr_core::{CoordKey, ElevationMap, ElevationProvider, FlatTerrain, Position};

use crate::config::Config;

const FEET_PER_METRE: f64 = 3.28084;

#[derive(Debug, Error)]
pub enum ElevationFetchError {
    #[error("elevation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("elevation provider HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("elevation provider response missing elevation field")]
    MissingField,
    #[error("elevation provider returned {got} values for {expected} points")]
    CountMismatch { expected: usize, got: usize },
}

#[derive(Debug, Deserialize)]
struct OpenMeteoElevationResponse {
    elevation: Option<Vec<f64>>,
}

/// Open-Meteo client. Holds no lookup state between calls; repeated points
/// within one plan are served by the caller's `ElevationCache`.
pub struct OpenMeteoElevation {
    client: Client,
    url: String,
    timeout: Duration,
    max_points: usize,
}

impl OpenMeteoElevation {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.elevation_url.trim().to_string(),
            timeout: Duration::from_secs(config.elevation_timeout_s.max(1)),
            max_points: config.elevation_max_points_per_request.max(1),
        }
    }

    async fn fetch_chunk(&self, chunk: &[Position]) -> Result<Vec<f64>, ElevationFetchError> {
        let latitudes = join_params(chunk.iter().map(|p| p.lat));
        let longitudes = join_params(chunk.iter().map(|p| p.lon));
        let url = build_provider_url(&self.url, &latitudes, &longitudes);

        let response = self.client.get(url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(ElevationFetchError::Status(response.status()));
        }
        let payload: OpenMeteoElevationResponse = response.json().await?;
        let metres = payload.elevation.ok_or(ElevationFetchError::MissingField)?;
        if metres.len() != chunk.len() {
            return Err(ElevationFetchError::CountMismatch {
                expected: chunk.len(),
                got: metres.len(),
            });
        }
        Ok(metres.into_iter().map(|m| m * FEET_PER_METRE).collect())
    }
}

impl ElevationProvider for OpenMeteoElevation {
    async fn elevations_for(&self, points: &[Position]) -> ElevationMap {
        let mut result = ElevationMap::new();
        let mut queued: HashSet<CoordKey> = HashSet::new();
        let pending: Vec<Position> = points
            .iter()
            .map(|point| CoordKey::from_position(*point))
            .filter(|key| queued.insert(*key))
            .map(|key| key.position())
            .collect();
        if pending.is_empty() {
            return result;
        }

        let chunks: Vec<&[Position]> = pending.chunks(self.max_points).collect();
        tracing::debug!(
            points = pending.len(),
            requests = chunks.len(),
            "Fetching terrain elevations"
        );
        let responses = join_all(chunks.iter().map(|chunk| self.fetch_chunk(chunk))).await;

        for (chunk, response) in chunks.iter().zip(responses) {
            match response {
                Ok(values) => {
                    for (point, value) in chunk.iter().zip(values) {
                        if !value.is_finite() {
                            continue;
                        }
                        result.insert(CoordKey::from_position(*point), value);
                    }
                }
                Err(err) => {
                    tracing::warn!(points = chunk.len(), "Terrain fetch failed: {}", err);
                }
            }
        }
        result
    }
}

/// Elevation source chosen at startup.
pub enum ElevationService {
    Disabled(FlatTerrain),
    OpenMeteo(OpenMeteoElevation),
}

impl ElevationService {
    pub fn from_config(config: &Config) -> Self {
        if config.elevation_enabled() {
            Self::OpenMeteo(OpenMeteoElevation::new(Client::new(), config))
        } else {
            Self::Disabled(FlatTerrain)
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::OpenMeteo(_))
    }

    /// Elevation in feet per input point, `None` where the lookup failed.
    pub async fn profile(&self, points: &[Position]) -> Vec<Option<f64>> {
        let values = self.elevations_for(points).await;
        points
            .iter()
            .map(|point| values.get(&CoordKey::from_position(*point)).copied())
            .collect()
    }
}

impl ElevationProvider for ElevationService {
    async fn elevations_for(&self, points: &[Position]) -> ElevationMap {
        match self {
            Self::Disabled(flat) => flat.elevations_for(points).await,
            Self::OpenMeteo(client) => client.elevations_for(points).await,
        }
    }
}

fn join_params(values: impl Iterator<Item = f64>) -> String {
    values
        .map(|value| format!("{:.5}", value))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_provider_url(base: &str, latitudes: &str, longitudes: &str) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!(
        "{}{}latitude={}&longitude={}",
        base, separator, latitudes, longitudes
    )
}
