//! Server configuration from environment.

use std::env;
use std::path::PathBuf;

use vfr_core::PlannerConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub airports_csv: PathBuf,
    pub runways_csv: PathBuf,
    pub navaids_csv: PathBuf,
    pub airspaces_geojson: PathBuf,
    /// Open-Meteo style elevation endpoint. Empty disables live terrain.
    pub elevation_url: String,
    pub elevation_timeout_s: u64,
    pub elevation_max_points_per_request: usize,
    pub planner: PlannerConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = PlannerConfig::default();
        Self {
            server_port: parse_env("VFR_PORT").unwrap_or(8000),
            airports_csv: path_env("VFR_AIRPORTS_CSV", "data/airports.csv"),
            runways_csv: path_env("VFR_RUNWAYS_CSV", "data/runways.csv"),
            navaids_csv: path_env("VFR_NAVAIDS_CSV", "data/navaids.csv"),
            airspaces_geojson: path_env("VFR_AIRSPACES_GEOJSON", "data/airspaces.geojson"),
            elevation_url: env::var("VFR_ELEVATION_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/elevation".to_string()),
            elevation_timeout_s: parse_env("VFR_ELEVATION_TIMEOUT_S").unwrap_or(5),
            elevation_max_points_per_request: parse_env("VFR_ELEVATION_MAX_POINTS").unwrap_or(100),
            planner: PlannerConfig {
                graph_max_dist_nm: parse_env("VFR_GRAPH_MAX_DIST_NM")
                    .unwrap_or(defaults.graph_max_dist_nm),
                detour_max_iterations: parse_env("VFR_DETOUR_MAX_ITERATIONS")
                    .unwrap_or(defaults.detour_max_iterations),
                ..defaults
            },
        }
    }

    /// Defaults with live terrain disabled, for tests and offline runs.
    pub fn offline() -> Self {
        Self {
            elevation_url: String::new(),
            ..Self::from_env()
        }
    }

    pub fn elevation_enabled(&self) -> bool {
        !self.elevation_url.trim().is_empty()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn path_env(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
