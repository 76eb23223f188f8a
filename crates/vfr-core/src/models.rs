//! Core data models for the route planner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spatial::{ring_contains, segment_crosses_ring, Bounds};

/// Minimum runway length for a diversion airport, in metres.
pub const MIN_DIVERSION_RUNWAY_M: f64 = 610.0;

/// Surface keywords (lowercase substrings) that count as a hard runway.
const HARD_SURFACE_KEYWORDS: [&str; 6] = ["asp", "con", "bit", "pav", "pem", "tarmac"];

/// Airspace categories treated as restricted, compared in uppercase.
const RESTRICTED_CATEGORIES: [&str; 8] = [
    "RESTRICTED",
    "PROHIBITED",
    "DANGER",
    "CTR",
    "TMA",
    "R",
    "P",
    "D",
];

/// Airspace classes treated as restricted for VFR routing.
const RESTRICTED_CLASSES: [&str; 4] = ["A", "B", "C", "D"];

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside the lat/lon value ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

// ========== NODE CATALOG ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Airport,
    Navaid,
    Intersection,
    Waypoint,
}

/// A navigational point usable as a route vertex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Externally visible code (ICAO, GPS, local code or dataset id).
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub category: NodeCategory,
    #[serde(default)]
    pub elevation_ft: Option<f64>,
    /// Facility data, present for airports only.
    #[serde(default)]
    pub airport: Option<AirportFacility>,
}

impl Node {
    pub fn position(&self) -> Position {
        Position::new(self.lat, self.lon)
    }

    /// Whether this node can be inserted as a diversion airport.
    pub fn is_eligible_diversion(&self, fuel_only: bool) -> bool {
        if self.category != NodeCategory::Airport {
            return false;
        }
        let Some(facility) = &self.airport else {
            return false;
        };
        if facility.private || !facility.kind.accepts_diversions() {
            return false;
        }
        if fuel_only && !facility.fuel {
            return false;
        }
        facility.has_hard_runway(MIN_DIVERSION_RUNWAY_M)
    }

    pub fn is_closed_airport(&self) -> bool {
        self.airport
            .as_ref()
            .is_some_and(|facility| facility.kind == AirportKind::Closed)
    }

    /// The fuel-stop predicate: an eligible diversion airport that sells fuel.
    pub fn is_fuel_stop(&self) -> bool {
        self.is_eligible_diversion(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirportKind {
    Large,
    Medium,
    Small,
    Heliport,
    SeaplaneBase,
    Closed,
    #[default]
    Other,
}

impl AirportKind {
    /// Parse an OurAirports `type` column value.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "large_airport" | "large" => Self::Large,
            "medium_airport" | "medium" => Self::Medium,
            "small_airport" | "small" => Self::Small,
            "heliport" => Self::Heliport,
            "seaplane_base" => Self::SeaplaneBase,
            "closed" => Self::Closed,
            _ => Self::Other,
        }
    }

    fn accepts_diversions(self) -> bool {
        matches!(self, Self::Large | Self::Medium | Self::Small)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AirportFacility {
    #[serde(default)]
    pub kind: AirportKind,
    /// Private-use field, never offered as a diversion.
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fuel: bool,
    #[serde(default)]
    pub runways: Vec<Runway>,
}

impl AirportFacility {
    pub fn has_hard_runway(&self, min_length_m: f64) -> bool {
        self.runways
            .iter()
            .any(|runway| !runway.closed && runway.length_m >= min_length_m && runway.is_hard_surface())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runway {
    pub length_m: f64,
    pub surface: String,
    #[serde(default)]
    pub closed: bool,
}

impl Runway {
    /// Paved, bitumen, concrete or asphalt surface.
    pub fn is_hard_surface(&self) -> bool {
        let surface = self.surface.to_lowercase();
        HARD_SURFACE_KEYWORDS
            .iter()
            .any(|keyword| surface.contains(keyword))
    }
}

// ========== AIRSPACE ==========

/// One polygon of an airspace: exterior ring plus optional holes.
#[derive(Debug, Clone, Serialize)]
pub struct AirspacePolygon {
    pub exterior: Vec<Position>,
    pub holes: Vec<Vec<Position>>,
    bounds: Bounds,
}

impl AirspacePolygon {
    /// Build a polygon, or `None` when the exterior has fewer than three distinct
    /// valid vertices.
    pub fn new(exterior: Vec<Position>, holes: Vec<Vec<Position>>) -> Option<Self> {
        if exterior.iter().any(|p| !p.is_valid()) {
            return None;
        }
        let mut distinct: Vec<Position> = Vec::new();
        for point in &exterior {
            if !distinct.contains(point) {
                distinct.push(*point);
            }
        }
        if distinct.len() < 3 {
            return None;
        }
        let bounds = Bounds::from_positions(&exterior)?;
        let holes = holes
            .into_iter()
            .filter(|ring| ring.len() >= 3 && ring.iter().all(|p| p.is_valid()))
            .collect();
        Some(Self {
            exterior,
            holes,
            bounds,
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn contains(&self, point: Position) -> bool {
        if !self.bounds.contains(point) {
            return false;
        }
        ring_contains(&self.exterior, point) && !self.holes.iter().any(|hole| ring_contains(hole, point))
    }

    /// True when any part of segment `a`→`b` lies inside the polygon.
    pub fn intersects_segment(&self, a: Position, b: Position) -> bool {
        if !self.bounds.intersects(&Bounds::of_segment(a, b)) {
            return false;
        }
        if self.contains(a) || self.contains(b) {
            return true;
        }
        segment_crosses_ring(a, b, &self.exterior)
            || self.holes.iter().any(|hole| segment_crosses_ring(a, b, hole))
    }
}

/// A reference airspace volume. Only the floor is modelled.
#[derive(Debug, Clone, Serialize)]
pub struct Airspace {
    pub name: String,
    pub class: String,
    pub category: String,
    pub lower_limit_ft: f64,
    pub polygons: Vec<AirspacePolygon>,
}

impl Airspace {
    pub fn bounds(&self) -> Option<Bounds> {
        self.polygons
            .iter()
            .map(AirspacePolygon::bounds)
            .reduce(|acc, next| acc.union(&next))
    }

    /// Restricted category (restricted, prohibited, danger, CTR, TMA) or class A–D.
    pub fn is_restricted(&self) -> bool {
        let category = self.category.trim().to_uppercase();
        let class = self.class.trim().to_uppercase();
        RESTRICTED_CATEGORIES.contains(&category.as_str())
            || RESTRICTED_CLASSES.contains(&class.as_str())
    }

    pub fn contains(&self, point: Position) -> bool {
        self.polygons.iter().any(|polygon| polygon.contains(point))
    }

    pub fn intersects_segment(&self, a: Position, b: Position) -> bool {
        self.first_intersecting_polygon(a, b).is_some()
    }

    pub fn first_intersecting_polygon(&self, a: Position, b: Position) -> Option<&AirspacePolygon> {
        self.polygons
            .iter()
            .find(|polygon| polygon.intersects_segment(a, b))
    }
}

// ========== REQUESTS ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Knots,
    Mph,
    Kmh,
}

impl SpeedUnit {
    pub fn to_knots(self, speed: f64) -> f64 {
        match self {
            Self::Knots => speed,
            Self::Mph => speed * 0.868976,
            Self::Kmh => speed * 0.539957,
        }
    }
}

fn default_max_leg_distance() -> f64 {
    150.0
}

/// A route planning request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: String,
    pub destination: String,
    /// Cruise speed in `speed_unit`.
    pub speed: f64,
    #[serde(default)]
    pub speed_unit: SpeedUnit,
    /// Planned cruise altitude in feet.
    pub altitude: f64,
    #[serde(default)]
    pub avoid_airspaces: bool,
    #[serde(default)]
    pub avoid_terrain: bool,
    #[serde(default = "default_max_leg_distance")]
    pub max_leg_distance: f64,
    /// Aircraft range in nm; `None` leaves legs bounded only by `max_leg_distance`.
    #[serde(default)]
    pub aircraft_range_nm: Option<f64>,
    /// Only insert diversion airports that sell fuel.
    #[serde(default)]
    pub fuel_stops_only: bool,
}

impl RouteRequest {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            speed: 120.0,
            speed_unit: SpeedUnit::Knots,
            altitude: 5500.0,
            avoid_airspaces: false,
            avoid_terrain: false,
            max_leg_distance: default_max_leg_distance(),
            aircraft_range_nm: None,
            fuel_stops_only: false,
        }
    }

    /// Longest permitted leg: the smaller of the leg cap and the aircraft range.
    pub fn leg_limit_nm(&self) -> f64 {
        match self.aircraft_range_nm {
            Some(range) if range.is_finite() && range > 0.0 => self.max_leg_distance.min(range),
            _ => self.max_leg_distance,
        }
    }
}

// ========== PLANNED ROUTE ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Origin,
    Node,
    Detour,
    Diversion,
    Destination,
}

/// A vertex of the planned polyline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePoint {
    pub ident: String,
    pub name: String,
    pub position: Position,
    pub kind: PointKind,
}

impl RoutePoint {
    pub fn from_node(node: &Node, kind: PointKind) -> Self {
        Self {
            ident: node.id.clone(),
            name: node.name.clone(),
            position: node.position(),
            kind,
        }
    }

    pub fn detour(position: Position) -> Self {
        Self {
            ident: "DETOUR".to_string(),
            name: "Airspace detour".to_string(),
            position,
            kind: PointKind::Detour,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Climb,
    Cruise,
    Descent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSegment {
    pub start: Position,
    pub end: Position,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub distance_nm: f64,
    pub vfr_altitude_ft: i32,
}

/// The final itinerary returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedRoute {
    /// Identifiers of every route point, `DETOUR` for synthetic points.
    pub route: Vec<String>,
    pub points: Vec<RoutePoint>,
    pub distance_nm: f64,
    pub time_hr: f64,
    pub origin_coords: Position,
    pub destination_coords: Position,
    pub overflown_airports: Vec<String>,
    pub overflown_coords: Vec<Position>,
    pub overflown_names: Vec<String>,
    pub segments: Vec<RouteSegment>,
    /// False when the graph search found nothing and the direct route was used.
    pub used_graph_route: bool,
    /// True when airspace detouring stopped at its iteration cap.
    pub detour_capped: bool,
    pub planned_at: DateTime<Utc>,
}
