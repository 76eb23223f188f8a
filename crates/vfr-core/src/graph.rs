//! Proximity graph over catalog nodes.

use serde::{Deserialize, Serialize};

use crate::models::Node;
use crate::spatial::{haversine_nm, EARTH_RADIUS_NM};

/// Longest edge kept in the proximity graph.
pub const GRAPH_MAX_DIST_NM: f64 = 200.0;

/// A directed edge between catalog node indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub distance_nm: f64,
}

/// Adjacency lists indexed like the catalog's node list.
///
/// Built once and read-only afterwards. Every edge `a → b` has a twin `b → a` with
/// the same weight, and each list is sorted by ascending distance.
#[derive(Debug, Clone, Default)]
pub struct ProximityGraph {
    adjacency: Vec<Vec<Edge>>,
    max_edge_nm: f64,
}

impl ProximityGraph {
    /// Connect every pair of distinct nodes closer than `max_edge_nm`.
    ///
    /// # Time Complexity
    /// *O*(*n^2*) distance evaluations, minus pairs rejected by the latitude check.
    pub fn build(nodes: &[Node], max_edge_nm: f64) -> Self {
        let mut adjacency: Vec<Vec<Edge>> = vec![Vec::new(); nodes.len()];
        // Great-circle distance is never shorter than the meridian arc between the
        // two latitudes, so pairs further apart in latitude can be skipped exactly.
        let max_dlat_rad = max_edge_nm / EARTH_RADIUS_NM;

        for i in 0..nodes.len() {
            let a = &nodes[i];
            for j in (i + 1)..nodes.len() {
                let b = &nodes[j];
                if (b.lat - a.lat).abs().to_radians() > max_dlat_rad {
                    continue;
                }
                let distance_nm = haversine_nm(a.lat, a.lon, b.lat, b.lon);
                if distance_nm > max_edge_nm {
                    continue;
                }
                adjacency[i].push(Edge {
                    from: i,
                    to: j,
                    distance_nm,
                });
                adjacency[j].push(Edge {
                    from: j,
                    to: i,
                    distance_nm,
                });
            }
        }

        for edges in &mut adjacency {
            edges.sort_by(|a, b| {
                a.distance_nm
                    .total_cmp(&b.distance_nm)
                    .then_with(|| a.to.cmp(&b.to))
            });
        }

        Self {
            adjacency,
            max_edge_nm,
        }
    }

    pub fn neighbors(&self, node: usize) -> &[Edge] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    pub fn max_edge_nm(&self) -> f64 {
        self.max_edge_nm
    }

    pub fn is_isolated(&self, node: usize) -> bool {
        self.neighbors(node).is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.adjacency.iter().flatten()
    }
}
