//! Shared application state.

use std::sync::Arc;

use vfr_core::Catalog;

use crate::config::Config;
use crate::elevation::ElevationService;

/// Read-only state shared by every handler.
pub struct AppState {
    catalog: Arc<Catalog>,
    elevation: ElevationService,
    config: Config,
}

impl AppState {
    pub fn new(catalog: Catalog, config: Config) -> Self {
        Self::with_elevation(catalog, ElevationService::from_config(&config), config)
    }

    pub fn with_elevation(catalog: Catalog, elevation: ElevationService, config: Config) -> Self {
        Self {
            catalog: Arc::new(catalog),
            elevation,
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn elevation(&self) -> &ElevationService {
        &self.elevation
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
