//! REST API routes.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vfr_core::{
    plan_route_with_config, Airspace, Bounds, Node, NodeCategory, PlannedRoute, Position,
    RouteError, RouteRequest,
};

use crate::api::request_id;
use crate::state::AppState;

/// Most points accepted by one terrain profile request.
const MAX_PROFILE_POINTS: usize = 2000;

type ApiError = (StatusCode, Json<Value>);

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "OK" }))
        .route("/airport/:ident", get(get_airport))
        .route("/airports/nearest", get(nearest_airport))
        .route("/route", post(plan_route_handler))
        .route("/airspaces", get(list_airspaces))
        .route("/terrain-profile", post(terrain_profile))
        .layer(middleware::from_fn(request_id::ensure_request_id))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "VFR route planner is running" }))
}

// === Airports ===

#[derive(Debug, Serialize)]
struct AirportSummary {
    icao: String,
    name: String,
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
    category: NodeCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<vfr_core::AirportKind>,
    fuel: bool,
    private: bool,
    longest_runway_m: Option<f64>,
}

impl From<&Node> for AirportSummary {
    fn from(node: &Node) -> Self {
        let facility = node.airport.as_ref();
        Self {
            icao: node.id.clone(),
            name: node.name.clone(),
            lat: node.lat,
            lon: node.lon,
            elevation: node.elevation_ft,
            category: node.category,
            kind: facility.map(|f| f.kind),
            fuel: facility.is_some_and(|f| f.fuel),
            private: facility.is_some_and(|f| f.private),
            longest_runway_m: facility.and_then(|f| {
                f.runways
                    .iter()
                    .filter(|runway| !runway.closed)
                    .map(|runway| runway.length_m)
                    .reduce(f64::max)
            }),
        }
    }
}

async fn get_airport(
    State(state): State<Arc<AppState>>,
    Path(ident): Path<String>,
) -> Result<Json<AirportSummary>, ApiError> {
    state
        .catalog()
        .node(&ident)
        .map(|node| Json(AirportSummary::from(node)))
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                format!("Airport {} not found", ident.trim().to_uppercase()),
            )
        })
}

#[derive(Debug, Deserialize)]
struct NearestQuery {
    lat: f64,
    lon: f64,
    #[serde(default)]
    fuel_only: bool,
    /// Comma separated idents to skip.
    #[serde(default)]
    exclude: Option<String>,
}

#[derive(Debug, Serialize)]
struct NearestResponse {
    #[serde(flatten)]
    airport: AirportSummary,
    distance_nm: f64,
}

async fn nearest_airport(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearestQuery>,
) -> Result<Json<NearestResponse>, ApiError> {
    let position = Position::new(query.lat, query.lon);
    if !position.is_valid() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "lat must be within [-90, 90], lon within [-180, 180]",
        ));
    }
    let exclude: HashSet<String> = query
        .exclude
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(|ident| ident.trim().to_uppercase())
        .filter(|ident| !ident.is_empty())
        .collect();

    let node = state
        .catalog()
        .nearest_eligible_airport(query.lat, query.lon, &exclude, query.fuel_only)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "No eligible airport found"))?;
    Ok(Json(NearestResponse {
        distance_nm: vfr_core::distance_nm(position, node.position()),
        airport: AirportSummary::from(node),
    }))
}

// === Routing ===

async fn plan_route_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<PlannedRoute>, ApiError> {
    plan_route_with_config(
        state.catalog(),
        state.elevation(),
        &request,
        &state.config().planner,
    )
    .await
    .map(Json)
    .map_err(|err| {
        let status = match err {
            RouteError::UnknownAirport(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        tracing::info!("Route request rejected: {}", err);
        error_response(status, err.to_string())
    })
}

// === Airspaces ===

#[derive(Debug, Deserialize)]
struct BoundsQuery {
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
}

async fn list_airspaces(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BoundsQuery>,
) -> Result<Json<Value>, ApiError> {
    if query.min_lat > query.max_lat || query.min_lon > query.max_lon {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "min_lat/min_lon must not exceed max_lat/max_lon",
        ));
    }
    let bounds = Bounds {
        min_lat: query.min_lat,
        min_lon: query.min_lon,
        max_lat: query.max_lat,
        max_lon: query.max_lon,
    };
    let features: Vec<Value> = state
        .catalog()
        .airspaces_in_bounds(&bounds)
        .into_iter()
        .map(airspace_feature)
        .collect();
    Ok(Json(json!({
        "type": "FeatureCollection",
        "features": features,
    })))
}

fn airspace_feature(airspace: &Airspace) -> Value {
    let ring = |points: &[Position]| -> Vec<[f64; 2]> {
        points.iter().map(|p| [p.lon, p.lat]).collect()
    };
    let polygons: Vec<Vec<Vec<[f64; 2]>>> = airspace
        .polygons
        .iter()
        .map(|polygon| {
            std::iter::once(ring(&polygon.exterior))
                .chain(polygon.holes.iter().map(|hole| ring(hole)))
                .collect()
        })
        .collect();
    json!({
        "type": "Feature",
        "properties": {
            "name": airspace.name,
            "class": airspace.class,
            "category": airspace.category,
            "lower_limit_ft": airspace.lower_limit_ft,
            "restricted": airspace.is_restricted(),
        },
        "geometry": {
            "type": "MultiPolygon",
            "coordinates": polygons,
        },
    })
}

// === Terrain ===

#[derive(Debug, Deserialize)]
struct TerrainProfileRequest {
    /// `[lat, lon]` pairs.
    points: Vec<[f64; 2]>,
}

#[derive(Debug, Serialize)]
struct TerrainSample {
    lat: f64,
    lon: f64,
    /// Feet, `null` when the lookup failed.
    elevation: Option<f64>,
}

async fn terrain_profile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TerrainProfileRequest>,
) -> Result<Json<Vec<TerrainSample>>, ApiError> {
    if request.points.len() > MAX_PROFILE_POINTS {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("at most {MAX_PROFILE_POINTS} points per request"),
        ));
    }
    let points: Vec<Position> = request
        .points
        .iter()
        .map(|[lat, lon]| Position::new(*lat, *lon))
        .collect();
    if points.iter().any(|point| !point.is_valid()) {
        return Err(error_response(StatusCode::BAD_REQUEST, "invalid coordinates"));
    }

    let elevations = state.elevation().profile(&points).await;
    Ok(Json(
        points
            .iter()
            .zip(elevations)
            .map(|(point, elevation)| TerrainSample {
                lat: point.lat,
                lon: point.lon,
                elevation,
            })
            .collect(),
    ))
}
