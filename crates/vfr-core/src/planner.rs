//! Route assembly: search, detours, diversions and altitudes in one call.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::altitude::{plan_leg_altitudes, ElevationProvider};
use crate::catalog::{normalize_ident, Catalog};
use crate::detour::{first_conflict, plan_detours, DETOUR_BUFFER_NM, DETOUR_MAX_ITERATIONS};
use crate::diversion::insert_diversions;
use crate::error::RouteError;
use crate::graph::GRAPH_MAX_DIST_NM;
use crate::models::{
    PlannedRoute, PointKind, RoutePoint, RouteRequest, RouteSegment, SegmentKind,
};
use crate::search::{find_path, SearchConstraints};
use crate::spatial::distance_nm;

/// Planner tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub graph_max_dist_nm: f64,
    pub detour_buffer_nm: f64,
    pub detour_max_iterations: usize,
    pub altitude_sample_interval_nm: f64,
    pub terrain_clearance_ft: f64,
    pub airspace_floor_clearance_ft: f64,
    pub min_vfr_altitude_ft: f64,
    pub altitude_increment_ft: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            graph_max_dist_nm: GRAPH_MAX_DIST_NM,
            detour_buffer_nm: DETOUR_BUFFER_NM,
            detour_max_iterations: DETOUR_MAX_ITERATIONS,
            altitude_sample_interval_nm: 10.0,
            terrain_clearance_ft: 1000.0,
            airspace_floor_clearance_ft: 500.0,
            min_vfr_altitude_ft: 3500.0,
            altitude_increment_ft: 1000.0,
        }
    }
}

pub async fn plan_route<P: ElevationProvider>(
    catalog: &Catalog,
    provider: &P,
    request: &RouteRequest,
) -> Result<PlannedRoute, RouteError> {
    plan_route_with_config(catalog, provider, request, &PlannerConfig::default()).await
}

/// Plan a route for `request`.
///
/// Only unknown endpoints and malformed requests fail. A missing graph route falls
/// back to the direct two-point route, unresolvable long legs are kept, and terrain
/// that cannot be fetched counts as sea level; each of those is logged.
pub async fn plan_route_with_config<P: ElevationProvider>(
    catalog: &Catalog,
    provider: &P,
    request: &RouteRequest,
    config: &PlannerConfig,
) -> Result<PlannedRoute, RouteError> {
    validate(request)?;

    let origin_id = normalize_ident(&request.origin);
    let destination_id = normalize_ident(&request.destination);
    let origin_idx = catalog
        .node_index(&origin_id)
        .ok_or_else(|| RouteError::UnknownAirport(origin_id.clone()))?;
    let destination_idx = catalog
        .node_index(&destination_id)
        .ok_or_else(|| RouteError::UnknownAirport(destination_id.clone()))?;
    let nodes = catalog.nodes();
    let origin = &nodes[origin_idx];
    let destination = &nodes[destination_idx];

    let leg_limit_nm = request.leg_limit_nm();
    let avoid = if request.avoid_airspaces {
        catalog.avoidable_airspaces(origin.position(), destination.position(), request.altitude)
    } else {
        Vec::new()
    };
    let constraints = SearchConstraints {
        leg_limit_nm,
        avoid: avoid.clone(),
        terrain_ceiling_ft: request
            .avoid_terrain
            .then_some(request.altitude - config.terrain_clearance_ft),
    };

    let (mut points, used_graph_route) =
        match find_path(catalog, origin_idx, destination_idx, &constraints) {
            Ok(result) => {
                let last = result.path.len().saturating_sub(1);
                let mut points: Vec<RoutePoint> = result
                    .path
                    .iter()
                    .enumerate()
                    .map(|(pos, idx)| {
                        let kind = if pos == 0 {
                            PointKind::Origin
                        } else if pos == last {
                            PointKind::Destination
                        } else {
                            PointKind::Node
                        };
                        RoutePoint::from_node(&nodes[*idx], kind)
                    })
                    .collect();
                if points.len() < 2 {
                    points.push(RoutePoint::from_node(destination, PointKind::Destination));
                }
                (points, true)
            }
            Err(err) => {
                debug!(error = %err, "Falling back to the direct route");
                (
                    vec![
                        RoutePoint::from_node(origin, PointKind::Origin),
                        RoutePoint::from_node(destination, PointKind::Destination),
                    ],
                    false,
                )
            }
        };

    let mut detour_capped = false;
    if !avoid.is_empty() {
        let outcome = plan_detours(
            points,
            &avoid,
            config.detour_buffer_nm,
            config.detour_max_iterations,
        );
        debug!(
            inserted = outcome.inserted,
            iterations = outcome.iterations,
            capped = outcome.capped,
            "Detour pass finished"
        );
        points = outcome.points;
        detour_capped = outcome.capped;
    }

    let diversions = insert_diversions(
        &mut points,
        catalog,
        leg_limit_nm,
        request.fuel_stops_only,
        &avoid,
    );
    if !detour_capped && first_conflict(&points, &avoid).is_some() {
        debug!("Restricted airspace conflict remains after diversions");
        detour_capped = true;
    }

    let positions: Vec<_> = points.iter().map(|point| point.position).collect();
    let altitudes = plan_leg_altitudes(&positions, catalog.airspaces(), provider, config).await;

    let leg_count = positions.len().saturating_sub(1);
    let segments: Vec<RouteSegment> = positions
        .windows(2)
        .zip(altitudes)
        .enumerate()
        .map(|(idx, (leg, vfr_altitude_ft))| RouteSegment {
            start: leg[0],
            end: leg[1],
            kind: segment_kind(idx, leg_count),
            distance_nm: distance_nm(leg[0], leg[1]),
            vfr_altitude_ft,
        })
        .collect();

    let total_nm: f64 = segments.iter().map(|segment| segment.distance_nm).sum();
    let speed_kt = request.speed_unit.to_knots(request.speed);
    let time_hr = if speed_kt > 0.0 { total_nm / speed_kt } else { 0.0 };

    let overflown: Vec<&RoutePoint> = points
        .iter()
        .filter(|point| point.kind == PointKind::Diversion)
        .collect();

    info!(
        origin = %origin.id,
        destination = %destination.id,
        points = points.len(),
        distance_nm = total_nm,
        used_graph_route,
        diversions = diversions.inserted.len(),
        unresolved_legs = diversions.unresolved_legs,
        detour_capped,
        "Route planned"
    );

    Ok(PlannedRoute {
        route: points.iter().map(|point| point.ident.clone()).collect(),
        distance_nm: round_to(total_nm, 1),
        time_hr: round_to(time_hr, 2),
        origin_coords: origin.position(),
        destination_coords: destination.position(),
        overflown_airports: overflown.iter().map(|point| point.ident.clone()).collect(),
        overflown_coords: overflown.iter().map(|point| point.position).collect(),
        overflown_names: overflown.iter().map(|point| point.name.clone()).collect(),
        segments,
        used_graph_route,
        detour_capped,
        planned_at: Utc::now(),
        points,
    })
}

fn validate(request: &RouteRequest) -> Result<(), RouteError> {
    if !request.speed.is_finite() || request.speed < 0.0 {
        return Err(RouteError::InvalidRequest(format!(
            "speed must be a non-negative number, got {}",
            request.speed
        )));
    }
    if !request.max_leg_distance.is_finite() || request.max_leg_distance <= 0.0 {
        return Err(RouteError::InvalidRequest(format!(
            "max_leg_distance must be positive, got {}",
            request.max_leg_distance
        )));
    }
    if let Some(range) = request.aircraft_range_nm {
        if !range.is_finite() || range <= 0.0 {
            return Err(RouteError::InvalidRequest(format!(
                "aircraft_range_nm must be positive, got {range}"
            )));
        }
    }
    if !request.altitude.is_finite() {
        return Err(RouteError::InvalidRequest("altitude must be finite".to_string()));
    }
    Ok(())
}

fn segment_kind(idx: usize, leg_count: usize) -> SegmentKind {
    if idx == 0 {
        SegmentKind::Climb
    } else if idx + 1 == leg_count {
        SegmentKind::Descent
    } else {
        SegmentKind::Cruise
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
