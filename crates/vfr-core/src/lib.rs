pub mod altitude;
pub mod catalog;
pub mod detour;
pub mod diversion;
pub mod error;
pub mod graph;
pub mod models;
pub mod planner;
pub mod search;
pub mod spatial;

pub use altitude::{
    plan_leg_altitudes, required_altitude_ft, CoordKey, ElevationCache, ElevationMap,
    ElevationProvider, FlatTerrain,
};
pub use catalog::{Catalog, CatalogRejects};
pub use detour::{first_conflict, plan_detours, DetourOutcome};
pub use diversion::{insert_diversions, DiversionOutcome};
pub use error::RouteError;
pub use graph::{Edge, ProximityGraph, GRAPH_MAX_DIST_NM};
pub use models::{
    AirportFacility, AirportKind, Airspace, AirspacePolygon, Node, NodeCategory, PlannedRoute,
    PointKind, Position, RoutePoint, RouteRequest, RouteSegment, Runway, SegmentKind, SpeedUnit,
};
pub use planner::{plan_route, plan_route_with_config, PlannerConfig};
pub use search::{find_path, SearchConstraints, SearchResult};
pub use spatial::{distance_nm, haversine_nm, Bounds};
