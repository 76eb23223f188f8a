//! In-memory node and airspace catalog.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::graph::{ProximityGraph, GRAPH_MAX_DIST_NM};
use crate::models::{Airspace, Node, Position};
use crate::spatial::{distance_nm, Bounds};

/// Counts of entries dropped while building a catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogRejects {
    pub invalid_nodes: usize,
    pub duplicate_nodes: usize,
    pub empty_airspaces: usize,
}

/// Validated nodes, airspaces and the proximity graph built over the nodes.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    airspaces: Vec<Airspace>,
    graph: ProximityGraph,
    rejects: CatalogRejects,
}

impl Catalog {
    pub fn new(nodes: Vec<Node>, airspaces: Vec<Airspace>) -> Self {
        Self::with_graph_cutoff(nodes, airspaces, GRAPH_MAX_DIST_NM)
    }

    /// Build a catalog whose graph keeps edges up to `max_edge_nm`.
    pub fn with_graph_cutoff(nodes: Vec<Node>, airspaces: Vec<Airspace>, max_edge_nm: f64) -> Self {
        let mut rejects = CatalogRejects::default();
        let mut kept: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(nodes.len());

        for mut node in nodes {
            node.id = normalize_ident(&node.id);
            if node.id.is_empty() || !node.position().is_valid() {
                warn!("Rejecting node {:?}: missing id or invalid coordinates", node.id);
                rejects.invalid_nodes += 1;
                continue;
            }
            if index.contains_key(&node.id) {
                warn!("Rejecting duplicate node id {}", node.id);
                rejects.duplicate_nodes += 1;
                continue;
            }
            index.insert(node.id.clone(), kept.len());
            kept.push(node);
        }

        let airspaces: Vec<Airspace> = airspaces
            .into_iter()
            .filter(|airspace| {
                if airspace.polygons.is_empty() {
                    warn!("Rejecting airspace {:?}: no usable polygon", airspace.name);
                    rejects.empty_airspaces += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        let graph = ProximityGraph::build(&kept, max_edge_nm);
        debug!(
            nodes = kept.len(),
            edges = graph.edge_count(),
            airspaces = airspaces.len(),
            "Catalog built"
        );

        Self {
            nodes: kept,
            index,
            airspaces,
            graph,
            rejects,
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index(id).map(|idx| &self.nodes[idx])
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(&normalize_ident(id)).copied()
    }

    pub fn node_at(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn airspaces(&self) -> &[Airspace] {
        &self.airspaces
    }

    pub fn graph(&self) -> &ProximityGraph {
        &self.graph
    }

    pub fn rejects(&self) -> CatalogRejects {
        self.rejects
    }

    /// Nearest airport passing the diversion predicate, skipping `exclude`.
    pub fn nearest_eligible_airport(
        &self,
        lat: f64,
        lon: f64,
        exclude: &HashSet<String>,
        fuel_only: bool,
    ) -> Option<&Node> {
        self.nearest_eligible_airport_within(Position::new(lat, lon), f64::INFINITY, exclude, fuel_only)
    }

    /// Same as [`Self::nearest_eligible_airport`], limited to `max_nm` from `position`.
    pub fn nearest_eligible_airport_within(
        &self,
        position: Position,
        max_nm: f64,
        exclude: &HashSet<String>,
        fuel_only: bool,
    ) -> Option<&Node> {
        self.nearest_eligible_airport_where(position, max_nm, exclude, fuel_only, |_| true)
    }

    /// Same as [`Self::nearest_eligible_airport_within`], also requiring `accept`.
    pub fn nearest_eligible_airport_where(
        &self,
        position: Position,
        max_nm: f64,
        exclude: &HashSet<String>,
        fuel_only: bool,
        accept: impl Fn(&Node) -> bool,
    ) -> Option<&Node> {
        if !position.is_valid() {
            return None;
        }
        self.nodes
            .iter()
            .filter(|node| !exclude.contains(&node.id))
            .filter(|node| node.is_eligible_diversion(fuel_only))
            .filter(|node| accept(*node))
            .map(|node| (node, distance_nm(position, node.position())))
            .filter(|(_, distance)| *distance <= max_nm)
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)))
            .map(|(node, _)| node)
    }

    /// Airspaces whose bounding box intersects `bounds`.
    pub fn airspaces_in_bounds(&self, bounds: &Bounds) -> Vec<&Airspace> {
        self.airspaces
            .iter()
            .filter(|airspace| {
                airspace
                    .bounds()
                    .is_some_and(|airspace_bounds| airspace_bounds.intersects(bounds))
            })
            .collect()
    }

    /// Restricted airspaces a route between `origin` and `destination` at
    /// `altitude_ft` must stay clear of.
    ///
    /// Volumes whose floor is above the planned altitude are ignored, and so are
    /// volumes containing either endpoint since they cannot be avoided.
    pub fn avoidable_airspaces(
        &self,
        origin: Position,
        destination: Position,
        altitude_ft: f64,
    ) -> Vec<&Airspace> {
        self.airspaces
            .iter()
            .filter(|airspace| airspace.is_restricted())
            .filter(|airspace| airspace.lower_limit_ft <= altitude_ft)
            .filter(|airspace| !airspace.contains(origin) && !airspace.contains(destination))
            .collect()
    }

    /// Airspaces containing `point`.
    pub fn airspaces_at(&self, point: Position) -> impl Iterator<Item = &Airspace> {
        self.airspaces
            .iter()
            .filter(move |airspace| airspace.contains(point))
    }
}

pub fn normalize_ident(id: &str) -> String {
    id.trim().to_uppercase()
}
