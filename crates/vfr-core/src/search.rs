//! Constrained shortest-path search over the proximity graph.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::RouteError;
use crate::graph::Edge;
use crate::models::{Airspace, Node};

/// Per-request edge filters.
#[derive(Debug, Clone)]
pub struct SearchConstraints<'a> {
    /// Longest edge the search may take.
    pub leg_limit_nm: f64,
    /// Restricted airspaces no edge may cross. Empty disables the check.
    pub avoid: Vec<&'a Airspace>,
    /// Highest terrain an intermediate node may have, when terrain avoidance is on.
    /// The departure and arrival fields are exempt.
    pub terrain_ceiling_ft: Option<f64>,
}

impl<'a> SearchConstraints<'a> {
    pub fn leg_limit(leg_limit_nm: f64) -> Self {
        Self {
            leg_limit_nm,
            avoid: Vec::new(),
            terrain_ceiling_ft: None,
        }
    }

    fn allows(&self, edge: &Edge, from: &Node, to: &Node, endpoints: [usize; 2]) -> bool {
        if edge.distance_nm > self.leg_limit_nm {
            return false;
        }
        // Endpoints were chosen by the caller; only the nodes in between are filtered.
        let intermediate = |idx: usize| !endpoints.contains(&idx);
        if intermediate(edge.to) && to.is_closed_airport() {
            return false;
        }
        if let Some(ceiling) = self.terrain_ceiling_ft {
            let too_high =
                |idx: usize, node: &Node| intermediate(idx) && node.elevation_ft.unwrap_or(0.0) > ceiling;
            if too_high(edge.from, from) || too_high(edge.to, to) {
                return false;
            }
        }
        let (a, b) = (from.position(), to.position());
        !self
            .avoid
            .iter()
            .any(|airspace| airspace.intersects_segment(a, b))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Catalog node indices from origin to destination inclusive.
    pub path: Vec<usize>,
    pub distance_nm: f64,
    pub nodes_visited: usize,
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    distance: FloatOrd,
    node: usize,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Shortest path by summed edge distance from `origin` to `destination`.
///
/// Edge filters do not depend on the path taken so far, so a single best-distance
/// label per node gives the optimum and no node is ever revisited.
pub fn find_path(
    catalog: &Catalog,
    origin: usize,
    destination: usize,
    constraints: &SearchConstraints<'_>,
) -> Result<SearchResult, RouteError> {
    let nodes = catalog.nodes();
    let graph = catalog.graph();
    let no_route = || RouteError::NoGraphRoute {
        origin: nodes.get(origin).map(|n| n.id.clone()).unwrap_or_default(),
        destination: nodes.get(destination).map(|n| n.id.clone()).unwrap_or_default(),
    };
    if origin >= nodes.len() || destination >= nodes.len() {
        return Err(no_route());
    }

    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut closed_set: HashSet<usize> = HashSet::new();
    let mut best: HashMap<usize, f64> = HashMap::new();
    let mut came_from: HashMap<usize, usize> = HashMap::new();

    open_set.push(Reverse(OpenNode {
        distance: FloatOrd(0.0),
        node: origin,
    }));
    best.insert(origin, 0.0);
    let mut nodes_visited = 0usize;

    while let Some(Reverse(current)) = open_set.pop() {
        if closed_set.contains(&current.node) {
            continue;
        }
        let best_g = best.get(&current.node).copied().unwrap_or(f64::INFINITY);
        if current.distance.0 > best_g + 1e-9 {
            continue;
        }
        nodes_visited += 1;

        if current.node == destination {
            let mut path = vec![destination];
            let mut cursor = destination;
            while let Some(&prev) = came_from.get(&cursor) {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            debug!(
                origin = %nodes[origin].id,
                destination = %nodes[destination].id,
                hops = path.len() - 1,
                distance_nm = best_g,
                nodes_visited,
                "Graph route found"
            );
            return Ok(SearchResult {
                path,
                distance_nm: best_g,
                nodes_visited,
            });
        }
        closed_set.insert(current.node);

        let from = &nodes[current.node];
        for edge in graph.neighbors(current.node) {
            if closed_set.contains(&edge.to) {
                continue;
            }
            // Edges are sorted by distance, so the rest are too long as well.
            if edge.distance_nm > constraints.leg_limit_nm {
                break;
            }
            let to = &nodes[edge.to];
            if !constraints.allows(edge, from, to, [origin, destination]) {
                continue;
            }
            let tentative = best_g + edge.distance_nm;
            if tentative < best.get(&edge.to).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(edge.to, current.node);
                best.insert(edge.to, tentative);
                open_set.push(Reverse(OpenNode {
                    distance: FloatOrd(tentative),
                    node: edge.to,
                }));
            }
        }
    }

    debug!(nodes_visited, "Graph search exhausted");
    Err(no_route())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AirspacePolygon, NodeCategory, Position};

    fn waypoint(id: &str, lat: f64, lon: f64, elevation_ft: f64) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            lat,
            lon,
            category: NodeCategory::Waypoint,
            elevation_ft: Some(elevation_ft),
            airport: None,
        }
    }

    /// A to D along a line of latitude, with a high northern detour through E.
    fn chain() -> Catalog {
        Catalog::new(
            vec![
                waypoint("A", 37.0, -122.0, 0.0),
                waypoint("B", 37.0, -121.0, 8000.0),
                waypoint("C", 37.0, -120.0, 0.0),
                waypoint("E", 37.8, -121.0, 0.0),
            ],
            Vec::new(),
        )
    }

    fn ids(catalog: &Catalog, path: &[usize]) -> Vec<String> {
        path.iter()
            .filter_map(|idx| catalog.node_at(*idx))
            .map(|node| node.id.clone())
            .collect()
    }

    #[test]
    fn shortest_path_uses_hops_under_leg_limit() {
        let catalog = chain();
        let a = catalog.node_index("A").unwrap();
        let c = catalog.node_index("C").unwrap();
        let result = find_path(&catalog, a, c, &SearchConstraints::leg_limit(60.0)).unwrap();
        assert_eq!(ids(&catalog, &result.path), vec!["A", "B", "C"]);
        let mut unique = result.path.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), result.path.len());
    }

    #[test]
    fn terrain_ceiling_forces_the_long_way() {
        let catalog = chain();
        let a = catalog.node_index("A").unwrap();
        let c = catalog.node_index("C").unwrap();
        let constraints = SearchConstraints {
            leg_limit_nm: 80.0,
            avoid: Vec::new(),
            terrain_ceiling_ft: Some(4500.0),
        };
        let result = find_path(&catalog, a, c, &constraints).unwrap();
        assert_eq!(ids(&catalog, &result.path), vec!["A", "E", "C"]);
    }

    #[test]
    fn leg_limit_too_short_yields_no_route() {
        let catalog = chain();
        let a = catalog.node_index("A").unwrap();
        let c = catalog.node_index("C").unwrap();
        let err = find_path(&catalog, a, c, &SearchConstraints::leg_limit(20.0)).unwrap_err();
        assert!(matches!(err, RouteError::NoGraphRoute { .. }));
    }

    #[test]
    fn restricted_airspace_blocks_edges() {
        let catalog = chain();
        let box_over_b = Airspace {
            name: "R-1".to_string(),
            class: "G".to_string(),
            category: "RESTRICTED".to_string(),
            lower_limit_ft: 0.0,
            polygons: AirspacePolygon::new(
                vec![
                    Position::new(36.8, -121.2),
                    Position::new(36.8, -120.8),
                    Position::new(37.2, -120.8),
                    Position::new(37.2, -121.2),
                ],
                Vec::new(),
            )
            .into_iter()
            .collect(),
        };
        let a = catalog.node_index("A").unwrap();
        let c = catalog.node_index("C").unwrap();
        let constraints = SearchConstraints {
            leg_limit_nm: 80.0,
            avoid: vec![&box_over_b],
            terrain_ceiling_ft: None,
        };
        let result = find_path(&catalog, a, c, &constraints).unwrap();
        assert_eq!(ids(&catalog, &result.path), vec!["A", "E", "C"]);
    }

    #[test]
    fn origin_equals_destination() {
        let catalog = chain();
        let a = catalog.node_index("A").unwrap();
        let result = find_path(&catalog, a, a, &SearchConstraints::leg_limit(10.0)).unwrap();
        assert_eq!(result.path, vec![a]);
        assert_eq!(result.distance_nm, 0.0);
    }

    #[test]
    fn high_departure_field_is_exempt_from_terrain_ceiling() {
        let catalog = Catalog::new(
            vec![
                waypoint("HIGH", 37.0, -122.0, 6000.0),
                waypoint("MID", 37.0, -121.0, 0.0),
                waypoint("LOW", 37.0, -120.0, 0.0),
            ],
            Vec::new(),
        );
        let origin = catalog.node_index("HIGH").unwrap();
        let destination = catalog.node_index("LOW").unwrap();
        let constraints = SearchConstraints {
            leg_limit_nm: 60.0,
            avoid: Vec::new(),
            terrain_ceiling_ft: Some(4500.0),
        };
        let result = find_path(&catalog, origin, destination, &constraints).unwrap();
        assert_eq!(ids(&catalog, &result.path), vec!["HIGH", "MID", "LOW"]);

        let reverse = find_path(&catalog, destination, origin, &constraints).unwrap();
        assert_eq!(ids(&catalog, &reverse.path), vec!["LOW", "MID", "HIGH"]);
    }

    #[test]
    fn closed_airport_is_not_a_through_node() {
        use crate::models::{AirportFacility, AirportKind};

        let mut closed = waypoint("CLSD", 37.0, -121.0, 0.0);
        closed.category = NodeCategory::Airport;
        closed.airport = Some(AirportFacility {
            kind: AirportKind::Closed,
            private: false,
            fuel: false,
            runways: Vec::new(),
        });
        let catalog = Catalog::new(
            vec![
                waypoint("A", 37.0, -122.0, 0.0),
                closed,
                waypoint("C", 37.0, -120.0, 0.0),
                waypoint("E", 37.8, -121.0, 0.0),
            ],
            Vec::new(),
        );
        let a = catalog.node_index("A").unwrap();
        let c = catalog.node_index("C").unwrap();
        let result = find_path(&catalog, a, c, &SearchConstraints::leg_limit(80.0)).unwrap();
        assert_eq!(ids(&catalog, &result.path), vec!["A", "E", "C"]);

        let clsd = catalog.node_index("CLSD").unwrap();
        let to_closed = find_path(&catalog, a, clsd, &SearchConstraints::leg_limit(80.0)).unwrap();
        assert_eq!(ids(&catalog, &to_closed.path), vec!["A", "CLSD"]);
    }
}
