//! Error kinds raised while planning a route.

use thiserror::Error;

/// Planning errors.
///
/// Only `UnknownAirport` and `InvalidRequest` reach callers of
/// [`crate::planner::plan_route`]; the rest are recovered inside the planner and
/// logged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("unknown airport: {0}")]
    UnknownAirport(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no graph route from {origin} to {destination}")]
    NoGraphRoute { origin: String, destination: String },

    #[error("elevation unavailable for {points} point(s): {reason}")]
    ElevationUnavailable { points: usize, reason: String },

    #[error("no eligible diversion airport within {radius_nm:.1} nm of {lat:.4}, {lon:.4}")]
    NoEligibleDiversionAirport { lat: f64, lon: f64, radius_nm: f64 },
}

impl RouteError {
    /// Errors that end a planning call instead of degrading the plan.
    pub fn is_surfaced(&self) -> bool {
        matches!(self, Self::UnknownAirport(_) | Self::InvalidRequest(_))
    }
}
