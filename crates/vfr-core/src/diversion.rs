//! Splitting long legs with intermediate airports.

use std::collections::HashSet;

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::RouteError;
use crate::models::{Airspace, Node, PointKind, RoutePoint};
use crate::spatial::{distance_nm, midpoint};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiversionOutcome {
    /// Idents of inserted airports, in insertion order.
    pub inserted: Vec<String>,
    /// Legs still longer than the limit because no airport qualified.
    pub unresolved_legs: usize,
}

/// Break every leg longer than `leg_limit_nm` by inserting the nearest eligible
/// airport within half the leg length of its midpoint.
///
/// The two halves are re-checked before moving on. Airports already on the route
/// are never inserted again, so the loop ends once the candidates run out. A route
/// whose legs all fit is left unchanged.
///
/// A candidate is skipped when either new leg would enter one of the `avoid`
/// airspaces.
pub fn insert_diversions(
    points: &mut Vec<RoutePoint>,
    catalog: &Catalog,
    leg_limit_nm: f64,
    fuel_only: bool,
    avoid: &[&Airspace],
) -> DiversionOutcome {
    let mut outcome = DiversionOutcome::default();
    let mut exclude: HashSet<String> = points
        .iter()
        .filter(|point| point.kind != PointKind::Detour)
        .map(|point| point.ident.clone())
        .collect();

    let mut idx = 0usize;
    while idx + 1 < points.len() {
        let (a, b) = (points[idx].position, points[idx + 1].position);
        let leg_nm = distance_nm(a, b);
        if leg_nm <= leg_limit_nm {
            idx += 1;
            continue;
        }

        let mid = midpoint(a, b);
        let radius_nm = leg_nm / 2.0;
        let clear_of_airspace = |candidate: &Node| {
            let via = candidate.position();
            !avoid.iter().any(|airspace| {
                airspace.intersects_segment(a, via) || airspace.intersects_segment(via, b)
            })
        };
        match catalog.nearest_eligible_airport_where(
            mid,
            radius_nm,
            &exclude,
            fuel_only,
            clear_of_airspace,
        ) {
            Some(airport) => {
                debug!(
                    airport = %airport.id,
                    leg_nm,
                    "Inserting diversion airport"
                );
                exclude.insert(airport.id.clone());
                outcome.inserted.push(airport.id.clone());
                points.insert(idx + 1, RoutePoint::from_node(airport, PointKind::Diversion));
            }
            None => {
                let err = RouteError::NoEligibleDiversionAirport {
                    lat: mid.lat,
                    lon: mid.lon,
                    radius_nm,
                };
                debug!(error = %err, leg_nm, "Keeping long leg");
                outcome.unresolved_legs += 1;
                idx += 1;
            }
        }
    }

    outcome
}
