//! Geometric detours around restricted airspace.
//!
//! Works in planar lon/lat degrees: nearest boundary points, centroids and the
//! 0.0167°/nm offset are flat-earth approximations, adequate at detour scale.

use tracing::debug;

use crate::models::{Airspace, AirspacePolygon, RoutePoint};
use crate::spatial::{closest_point_on_ring, midpoint, offset_away, ring_centroid};

pub const DETOUR_BUFFER_NM: f64 = 5.0;
pub const DETOUR_MAX_ITERATIONS: usize = 10;

#[derive(Debug, Clone)]
pub struct DetourOutcome {
    pub points: Vec<RoutePoint>,
    /// Detour points added.
    pub inserted: usize,
    pub iterations: usize,
    /// The polyline still crosses restricted airspace after the last iteration.
    pub capped: bool,
}

/// First segment, in route order, crossing any of `airspaces` (checked in the
/// order given). Returns the segment's start index and the offending polygon.
pub fn first_conflict<'a>(
    points: &[RoutePoint],
    airspaces: &[&'a Airspace],
) -> Option<(usize, &'a AirspacePolygon)> {
    points.windows(2).enumerate().find_map(|(idx, leg)| {
        let (a, b) = (leg[0].position, leg[1].position);
        airspaces
            .iter()
            .copied()
            .find_map(|airspace| airspace.first_intersecting_polygon(a, b))
            .map(|polygon| (idx, polygon))
    })
}

/// Insert detour points until no segment crosses `airspaces` or
/// `max_iterations` insertions have been made.
pub fn plan_detours(
    mut points: Vec<RoutePoint>,
    airspaces: &[&Airspace],
    buffer_nm: f64,
    max_iterations: usize,
) -> DetourOutcome {
    let mut inserted = 0usize;
    let mut iterations = 0usize;

    while let Some((idx, polygon)) = first_conflict(&points, airspaces) {
        if iterations >= max_iterations {
            debug!(iterations, "Detour cap reached with conflicts remaining");
            return DetourOutcome {
                points,
                inserted,
                iterations,
                capped: true,
            };
        }
        iterations += 1;

        let mid = midpoint(points[idx].position, points[idx + 1].position);
        let Some(boundary) = closest_point_on_ring(&polygon.exterior, mid) else {
            continue;
        };
        let centre = ring_centroid(&polygon.exterior).unwrap_or(mid);
        let detour = offset_away(centre, boundary, buffer_nm);
        debug!(
            segment = idx,
            lat = detour.lat,
            lon = detour.lon,
            "Inserting detour point"
        );
        points.insert(idx + 1, RoutePoint::detour(detour));
        inserted += 1;
    }

    DetourOutcome {
        points,
        inserted,
        iterations,
        capped: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PointKind, Position};

    fn point(ident: &str, lat: f64, lon: f64) -> RoutePoint {
        RoutePoint {
            ident: ident.to_string(),
            name: ident.to_string(),
            position: Position::new(lat, lon),
            kind: PointKind::Node,
        }
    }

    fn restricted_box(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Airspace {
        Airspace {
            name: "R-2508".to_string(),
            class: "G".to_string(),
            category: "R".to_string(),
            lower_limit_ft: 0.0,
            polygons: AirspacePolygon::new(
                vec![
                    Position::new(min_lat, min_lon),
                    Position::new(min_lat, max_lon),
                    Position::new(max_lat, max_lon),
                    Position::new(max_lat, min_lon),
                    Position::new(min_lat, min_lon),
                ],
                Vec::new(),
            )
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn clean_route_is_untouched() {
        let airspace = restricted_box(38.0, -121.0, 38.5, -120.5);
        let route = vec![point("A", 37.0, -122.0), point("B", 37.0, -120.0)];
        let outcome = plan_detours(route, &[&airspace], DETOUR_BUFFER_NM, DETOUR_MAX_ITERATIONS);
        assert_eq!(outcome.inserted, 0);
        assert!(!outcome.capped);
        assert_eq!(outcome.points.len(), 2);
    }

    #[test]
    fn skirts_a_box_or_reports_the_cap() {
        // Box straddling the route just south of the centre line.
        let airspace = restricted_box(36.9, -121.2, 37.05, -120.8);
        let route = vec![point("A", 37.0, -122.0), point("B", 37.0, -120.0)];
        let outcome = plan_detours(route, &[&airspace], DETOUR_BUFFER_NM, DETOUR_MAX_ITERATIONS);

        assert!(outcome.inserted >= 1);
        assert_eq!(outcome.points.first().map(|p| p.ident.as_str()), Some("A"));
        assert_eq!(outcome.points.last().map(|p| p.ident.as_str()), Some("B"));
        assert!(outcome.capped || first_conflict(&outcome.points, &[&airspace]).is_none());
        assert!(outcome
            .points
            .iter()
            .filter(|p| p.kind == PointKind::Detour)
            .all(|p| p.ident == "DETOUR"));
    }

    #[test]
    fn zero_iterations_caps_immediately() {
        let airspace = restricted_box(36.9, -121.2, 37.1, -120.8);
        let route = vec![point("A", 37.0, -122.0), point("B", 37.0, -120.0)];
        let outcome = plan_detours(route, &[&airspace], DETOUR_BUFFER_NM, 0);
        assert!(outcome.capped);
        assert_eq!(outcome.inserted, 0);
    }
}
