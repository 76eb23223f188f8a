//! Minimum safe VFR altitude per leg.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RouteError;
use crate::models::{Airspace, Position};
use crate::planner::PlannerConfig;
use crate::spatial::sample_leg;

/// A coordinate rounded to five decimals (about 1 m), used as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordKey {
    lat_e5: i64,
    lon_e5: i64,
}

impl CoordKey {
    pub fn from_position(position: Position) -> Self {
        Self {
            lat_e5: (position.lat * 1e5).round() as i64,
            lon_e5: (position.lon * 1e5).round() as i64,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.lat_e5 as f64 / 1e5, self.lon_e5 as f64 / 1e5)
    }
}

/// Terrain elevations in feet. Points missing from the map could not be fetched.
pub type ElevationMap = HashMap<CoordKey, f64>;

/// Source of terrain elevations.
pub trait ElevationProvider: Send + Sync {
    /// Elevation in feet for as many of `points` as the source can resolve.
    fn elevations_for(&self, points: &[Position]) -> impl Future<Output = ElevationMap> + Send;
}

/// Sea-level terrain everywhere. Used when live lookups are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain;

impl ElevationProvider for FlatTerrain {
    async fn elevations_for(&self, points: &[Position]) -> ElevationMap {
        points
            .iter()
            .map(|point| (CoordKey::from_position(*point), 0.0))
            .collect()
    }
}

/// Elevations fetched during one planning call.
pub struct ElevationCache<'a, P: ElevationProvider> {
    provider: &'a P,
    values: ElevationMap,
    missing: usize,
}

impl<'a, P: ElevationProvider> ElevationCache<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            values: HashMap::new(),
            missing: 0,
        }
    }

    /// Fetch every point not already cached in one provider call.
    pub async fn prefetch(&mut self, points: &[Position]) {
        let mut wanted: Vec<Position> = Vec::new();
        let mut seen: HashSet<CoordKey> = HashSet::new();
        for point in points {
            let key = CoordKey::from_position(*point);
            if !self.values.contains_key(&key) && seen.insert(key) {
                wanted.push(key.position());
            }
        }
        if wanted.is_empty() {
            return;
        }

        let fetched = self.provider.elevations_for(&wanted).await;
        for point in &wanted {
            let key = CoordKey::from_position(*point);
            match fetched.get(&key) {
                Some(value) if value.is_finite() => {
                    self.values.insert(key, *value);
                }
                _ => {
                    self.missing += 1;
                    self.values.insert(key, 0.0);
                }
            }
        }
        if self.missing > 0 {
            let err = RouteError::ElevationUnavailable {
                points: self.missing,
                reason: "provider returned no value".to_string(),
            };
            warn!(error = %err, "Treating missing terrain as sea level");
        }
    }

    pub fn elevation_ft(&self, point: Position) -> f64 {
        self.values
            .get(&CoordKey::from_position(point))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn missing(&self) -> usize {
        self.missing
    }
}

/// Altitude for the given terrain and airspace floor maxima, clamped to the VFR
/// minimum and rounded up to the altitude increment.
pub fn required_altitude_ft(max_terrain_ft: f64, max_floor_ft: f64, config: &PlannerConfig) -> i32 {
    let required = (max_terrain_ft + config.terrain_clearance_ft)
        .max(max_floor_ft + config.airspace_floor_clearance_ft)
        .max(config.min_vfr_altitude_ft);
    let increment = config.altitude_increment_ft.max(1.0);
    ((required / increment).ceil() * increment) as i32
}

/// Highest floor among airspaces containing `point`, 0 when none does.
fn max_floor_at(airspaces: &[Airspace], point: Position) -> f64 {
    airspaces
        .iter()
        .filter(|airspace| airspace.contains(point))
        .map(|airspace| airspace.lower_limit_ft)
        .fold(0.0, f64::max)
}

/// Minimum safe altitude for each leg of `points`.
pub async fn plan_leg_altitudes<P: ElevationProvider>(
    points: &[Position],
    airspaces: &[Airspace],
    provider: &P,
    config: &PlannerConfig,
) -> Vec<i32> {
    let legs: Vec<Vec<Position>> = points
        .windows(2)
        .map(|leg| sample_leg(leg[0], leg[1], config.altitude_sample_interval_nm))
        .collect();

    let mut cache = ElevationCache::new(provider);
    let all_samples: Vec<Position> = legs.iter().flatten().copied().collect();
    cache.prefetch(&all_samples).await;

    legs.iter()
        .enumerate()
        .map(|(idx, samples)| {
            let max_terrain = samples
                .iter()
                .map(|point| cache.elevation_ft(*point))
                .fold(0.0, f64::max);
            let max_floor = samples
                .iter()
                .map(|point| max_floor_at(airspaces, *point))
                .fold(0.0, f64::max);
            let altitude = required_altitude_ft(max_terrain, max_floor, config);
            debug!(
                leg = idx,
                samples = samples.len(),
                max_terrain,
                max_floor,
                altitude,
                "Leg altitude"
            );
            altitude
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AirspacePolygon;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Terrain rising linearly with longitude, counting provider calls.
    struct Ramp {
        calls: AtomicUsize,
        ft_per_degree: f64,
    }

    impl ElevationProvider for Ramp {
        async fn elevations_for(&self, points: &[Position]) -> ElevationMap {
            self.calls.fetch_add(1, Ordering::SeqCst);
            points
                .iter()
                .map(|p| (CoordKey::from_position(*p), (p.lon + 122.0) * self.ft_per_degree))
                .collect()
        }
    }

    /// Never answers.
    struct Offline;

    impl ElevationProvider for Offline {
        async fn elevations_for(&self, _points: &[Position]) -> ElevationMap {
            ElevationMap::new()
        }
    }

    #[test]
    fn required_altitude_is_clamped_and_rounded() {
        let config = PlannerConfig::default();
        assert_eq!(required_altitude_ft(0.0, 0.0, &config), 4000);
        assert_eq!(required_altitude_ft(3100.0, 0.0, &config), 5000);
        assert_eq!(required_altitude_ft(1000.0, 4500.0, &config), 5000);
        assert_eq!(required_altitude_ft(5000.0, 0.0, &config), 6000);
    }

    #[test]
    fn coord_key_rounds_to_five_decimals() {
        let a = CoordKey::from_position(Position::new(37.123454, -122.000001));
        let b = CoordKey::from_position(Position::new(37.123451, -122.000004));
        assert_eq!(a, b);
        assert!((a.position().lat - 37.12345).abs() < 1e-9);
    }

    #[tokio::test]
    async fn legs_use_highest_sample_with_one_fetch() {
        let provider = Ramp {
            calls: AtomicUsize::new(0),
            ft_per_degree: 6000.0,
        };
        let points = [
            Position::new(37.0, -122.0),
            Position::new(37.0, -121.5),
            Position::new(37.0, -121.0),
        ];
        let altitudes =
            plan_leg_altitudes(&points, &[], &provider, &PlannerConfig::default()).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        // Highest terrain 3000 ft then 6000 ft.
        assert_eq!(altitudes, vec![4000, 7000]);
        assert!(altitudes.iter().all(|alt| *alt >= 3500 && alt % 1000 == 0));
    }

    #[tokio::test]
    async fn airspace_floor_raises_altitude() {
        let airspace = Airspace {
            name: "Shelf".to_string(),
            class: "C".to_string(),
            category: "TMA".to_string(),
            lower_limit_ft: 6200.0,
            polygons: AirspacePolygon::new(
                vec![
                    Position::new(36.5, -121.8),
                    Position::new(36.5, -121.2),
                    Position::new(37.5, -121.2),
                    Position::new(37.5, -121.8),
                ],
                Vec::new(),
            )
            .into_iter()
            .collect(),
        };
        let points = [Position::new(37.0, -122.0), Position::new(37.0, -121.0)];
        let altitudes =
            plan_leg_altitudes(&points, &[airspace], &FlatTerrain, &PlannerConfig::default()).await;
        assert_eq!(altitudes, vec![7000]);
    }

    #[tokio::test]
    async fn missing_elevations_count_as_sea_level() {
        let points = [Position::new(37.0, -122.0), Position::new(37.2, -122.0)];
        let mut cache = ElevationCache::new(&Offline);
        cache.prefetch(&points).await;
        assert_eq!(cache.missing(), 2);
        let altitudes =
            plan_leg_altitudes(&points, &[], &Offline, &PlannerConfig::default()).await;
        assert_eq!(altitudes, vec![4000]);
    }
}
