//! Spatial math for distances, segment tests and polygon geometry.
//!
//! Distances are great-circle (haversine) in nautical miles. Polygon tests work on
//! raw lon/lat degrees as a plane, which is adequate for airspace-sized shapes.

use crate::models::Position;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Linear degrees-per-nautical-mile approximation used for synthetic offsets.
pub const DEG_PER_NM: f64 = 0.0167;

/// Calculate distance between two points in nautical miles using the haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Distance between two positions in nautical miles.
pub fn distance_nm(a: Position, b: Position) -> f64 {
    haversine_nm(a.lat, a.lon, b.lat, b.lon)
}

/// Axis-aligned lat/lon box used to skip exact polygon tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    pub fn from_positions(points: &[Position]) -> Option<Self> {
        let mut iter = points.iter().filter(|p| p.lat.is_finite() && p.lon.is_finite());
        let first = iter.next()?;
        let mut bounds = Self {
            min_lat: first.lat,
            min_lon: first.lon,
            max_lat: first.lat,
            max_lon: first.lon,
        };
        for point in iter {
            bounds.min_lat = bounds.min_lat.min(point.lat);
            bounds.min_lon = bounds.min_lon.min(point.lon);
            bounds.max_lat = bounds.max_lat.max(point.lat);
            bounds.max_lon = bounds.max_lon.max(point.lon);
        }
        Some(bounds)
    }

    pub fn of_segment(a: Position, b: Position) -> Self {
        Self {
            min_lat: a.lat.min(b.lat),
            min_lon: a.lon.min(b.lon),
            max_lat: a.lat.max(b.lat),
            max_lon: a.lon.max(b.lon),
        }
    }

    pub fn contains(&self, point: Position) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lat: self.min_lat.min(other.min_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lat: self.max_lat.max(other.max_lat),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }
}

/// Linear interpolation in lat/lon. `t` is clamped to [0, 1].
pub fn interpolate(a: Position, b: Position, t: f64) -> Position {
    let t = t.clamp(0.0, 1.0);
    Position {
        lat: a.lat + (b.lat - a.lat) * t,
        lon: a.lon + (b.lon - a.lon) * t,
    }
}

pub fn midpoint(a: Position, b: Position) -> Position {
    interpolate(a, b, 0.5)
}

/// Sample a leg every `interval_nm` along the straight lat/lon line.
///
/// Both endpoints are always included, so a leg shorter than the interval yields
/// two samples.
pub fn sample_leg(start: Position, end: Position, interval_nm: f64) -> Vec<Position> {
    let distance = distance_nm(start, end);
    let interval = interval_nm.max(0.1);
    let steps = (distance / interval).ceil().max(1.0) as usize;
    (0..=steps)
        .map(|idx| interpolate(start, end, idx as f64 / steps as f64))
        .collect()
}

/// Test whether two planar segments touch or cross.
///
/// Coordinates are `(x, y)` pairs; callers pass `(lon, lat)` degrees.
pub fn segments_intersect_2d(
    a1: (f64, f64),
    a2: (f64, f64),
    b1: (f64, f64),
    b2: (f64, f64),
) -> bool {
    // Tolerance in degrees, roughly a millimetre on the ground.
    const EPS_DEG: f64 = 1e-11;

    fn orient(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> f64 {
        (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
    }

    fn within(a: f64, b: f64, value: f64) -> bool {
        let min = a.min(b) - EPS_DEG;
        let max = a.max(b) + EPS_DEG;
        value >= min && value <= max
    }

    fn on_segment(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> bool {
        within(p.0, q.0, r.0) && within(p.1, q.1, r.1)
    }

    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if o1.abs() <= EPS_DEG && on_segment(a1, a2, b1) {
        return true;
    }
    if o2.abs() <= EPS_DEG && on_segment(a1, a2, b2) {
        return true;
    }
    if o3.abs() <= EPS_DEG && on_segment(b1, b2, a1) {
        return true;
    }
    if o4.abs() <= EPS_DEG && on_segment(b1, b2, a2) {
        return true;
    }

    let a_crosses = (o1 > EPS_DEG && o2 < -EPS_DEG) || (o1 < -EPS_DEG && o2 > EPS_DEG);
    let b_crosses = (o3 > EPS_DEG && o4 < -EPS_DEG) || (o3 < -EPS_DEG && o4 > EPS_DEG);
    a_crosses && b_crosses
}

/// Ray-casting point-in-ring test. The ring may be open or closed.
pub fn ring_contains(ring: &[Position], point: Position) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = ring[i].lat;
        let xi = ring[i].lon;
        let yj = ring[j].lat;
        let xj = ring[j].lon;

        if ((yi > point.lat) != (yj > point.lat))
            && (point.lon < (xj - xi) * (point.lat - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Check whether segment `a`→`b` crosses any edge of `ring`.
pub fn segment_crosses_ring(a: Position, b: Position, ring: &[Position]) -> bool {
    let n = ring.len();
    if n < 2 {
        return false;
    }
    let a_xy = (a.lon, a.lat);
    let b_xy = (b.lon, b.lat);
    (0..n).any(|i| {
        let p = ring[i];
        let q = ring[(i + 1) % n];
        segments_intersect_2d(a_xy, b_xy, (p.lon, p.lat), (q.lon, q.lat))
    })
}

/// Closest point to `point` on segment `a`→`b`, working in planar degrees.
pub fn closest_point_on_segment(point: Position, a: Position, b: Position) -> Position {
    let sx = b.lon - a.lon;
    let sy = b.lat - a.lat;
    let seg_len_sq = sx * sx + sy * sy;
    if seg_len_sq < 1e-18 {
        return a;
    }

    let px = point.lon - a.lon;
    let py = point.lat - a.lat;
    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);
    Position {
        lat: a.lat + t * sy,
        lon: a.lon + t * sx,
    }
}

/// Nearest point on a ring's boundary to `point` (planar degrees).
pub fn closest_point_on_ring(ring: &[Position], point: Position) -> Option<Position> {
    let n = ring.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(ring[0]);
    }

    let mut best: Option<(f64, Position)> = None;
    for i in 0..n {
        let candidate = closest_point_on_segment(point, ring[i], ring[(i + 1) % n]);
        let dx = candidate.lon - point.lon;
        let dy = candidate.lat - point.lat;
        let dist_sq = dx * dx + dy * dy;
        if best.map_or(true, |(current, _)| dist_sq < current) {
            best = Some((dist_sq, candidate));
        }
    }
    best.map(|(_, position)| position)
}

/// Vertex average of a ring, ignoring a repeated closing vertex.
pub fn ring_centroid(ring: &[Position]) -> Option<Position> {
    let vertices = open_ring(ring);
    if vertices.is_empty() {
        return None;
    }
    let count = vertices.len() as f64;
    let (sum_lat, sum_lon) = vertices
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
    Some(Position {
        lat: sum_lat / count,
        lon: sum_lon / count,
    })
}

/// Slice of the ring without its closing vertex when the ring is closed.
pub fn open_ring(ring: &[Position]) -> &[Position] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// Push `through` a further `distance_nm` along the planar ray `origin`→`through`,
/// using the linear degree approximation.
pub fn offset_away(origin: Position, through: Position, distance_nm: f64) -> Position {
    let dx = through.lon - origin.lon;
    let dy = through.lat - origin.lat;
    let len = (dx * dx + dy * dy).sqrt();
    let offset_deg = distance_nm * DEG_PER_NM;
    if len < 1e-12 {
        return Position {
            lat: through.lat + offset_deg,
            lon: through.lon,
        };
    }
    Position {
        lat: through.lat + dy / len * offset_deg,
        lon: through.lon + dx / len * offset_deg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(lat: f64, lon: f64) -> Position {
        Position { lat, lon }
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is about 60 nm.
        let dist = haversine_nm(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 60.04).abs() < 0.05, "got {dist}");
    }

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine_nm(37.4611, -122.1150, 37.4611, -122.1150), 0.0);
    }

    #[test]
    fn haversine_is_symmetric() {
        let ab = haversine_nm(37.4611, -122.1150, 37.7213, -122.2208);
        let ba = haversine_nm(37.7213, -122.2208, 37.4611, -122.1150);
        assert_eq!(ab, ba);
        assert!(ab > 0.0);
    }

    #[test]
    fn sample_leg_includes_both_endpoints() {
        let start = pos(37.0, -122.0);
        let end = pos(38.0, -122.0);
        let samples = sample_leg(start, end, 10.0);
        assert_eq!(samples.len(), 8);
        assert_eq!(samples.first().copied(), Some(start));
        assert_eq!(samples.last().copied(), Some(end));

        let short = sample_leg(start, pos(37.01, -122.0), 10.0);
        assert_eq!(short.len(), 2);
    }

    #[test]
    fn segments_intersect_detects_crossing() {
        assert!(segments_intersect_2d(
            (0.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (1.0, 0.0)
        ));
        assert!(!segments_intersect_2d(
            (0.0, 0.0),
            (1.0, 0.0),
            (0.0, 1.0),
            (1.0, 1.0)
        ));
    }

    #[test]
    fn ring_contains_uses_lat_lon() {
        let ring = vec![
            pos(0.0, 0.0),
            pos(0.0, 1.0),
            pos(1.0, 1.0),
            pos(1.0, 0.0),
            pos(0.0, 0.0),
        ];
        assert!(ring_contains(&ring, pos(0.5, 0.5)));
        assert!(!ring_contains(&ring, pos(1.5, 0.5)));
    }

    #[test]
    fn closest_point_on_ring_projects_onto_nearest_edge() {
        let ring = vec![pos(0.0, 0.0), pos(0.0, 1.0), pos(1.0, 1.0), pos(1.0, 0.0)];
        let nearest = closest_point_on_ring(&ring, pos(0.5, 0.9)).unwrap();
        assert!((nearest.lat - 0.5).abs() < 1e-12);
        assert!((nearest.lon - 1.0).abs() < 1e-12);
    }

    #[test]
    fn offset_away_moves_outward_by_buffer() {
        let center = pos(0.0, 0.0);
        let edge = pos(0.0, 1.0);
        let moved = offset_away(center, edge, 5.0);
        assert!((moved.lon - (1.0 + 5.0 * DEG_PER_NM)).abs() < 1e-12);
        assert!(moved.lat.abs() < 1e-12);
    }
}
