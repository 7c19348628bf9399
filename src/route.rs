//! # Route Planner
//!
//! Great-circle distance and ETA over an ordered list of waypoints.
//!
//! Distances use the haversine formula on a sphere of mean radius 6371 km and
//! are converted to nautical miles with [`KNOTS_PER_KMH`]. ETA divides the total
//! by a hull speed looked up per vessel class. The hull speeds are a
//! simplified displacement approximation (roughly `1.34 * sqrt(LWL ft)`) and
//! ignore wind, current and sea state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Coordinate, ServiceError, KNOTS_PER_KMH};

/// Mean Earth radius used for all route distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Vessel class → hull speed in knots.
///
/// Construction rejects zero, negative and non-finite speeds, so an ETA
/// division can never blow up.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HullSpeedTable {
    speeds: BTreeMap<String, f64>,
}

impl HullSpeedTable {
    pub fn new(speeds: BTreeMap<String, f64>) -> Result<Self, ServiceError> {
        if let Some((class, kts)) = speeds
            .iter()
            .find(|(_, kts)| !kts.is_finite() || **kts <= 0.0)
        {
            return Err(ServiceError::Domain(format!(
                "hull speed for vessel class '{}' must be positive, got {}",
                class, kts
            )));
        }
        Ok(Self { speeds })
    }

    /// Hull speed for `class`; unmapped classes are a domain error.
    pub fn hull_speed_kts(&self, class: &str) -> Result<f64, ServiceError> {
        self.speeds
            .get(class)
            .copied()
            .ok_or_else(|| {
                ServiceError::Domain(format!(
                    "unknown vessel class '{}', expected one of: {}",
                    class,
                    self.classes().collect::<Vec<_>>().join(", ")
                ))
            })
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.speeds.keys().map(String::as_str)
    }
}

/// Default table: small (~16 ft LWL) through xlarge (~40 ft LWL).
pub fn default_hull_speeds() -> BTreeMap<String, f64> {
    [
        ("small", 5.4),
        ("medium", 6.6),
        ("large", 7.6),
        ("xlarge", 8.5),
    ]
    .into_iter()
    .map(|(class, kts)| (class.to_string(), kts))
    .collect()
}

impl Default for HullSpeedTable {
    fn default() -> Self {
        Self {
            speeds: default_hull_speeds(),
        }
    }
}

/// Haversine distance between two points in nautical miles.
pub fn haversine_nm(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin() * KNOTS_PER_KMH
}

/// Distance of each consecutive leg, in order.
pub fn leg_distances_nm(waypoints: &[Coordinate]) -> Vec<f64> {
    waypoints
        .windows(2)
        .map(|leg| haversine_nm(&leg[0], &leg[1]))
        .collect()
}

/// Sum of all leg distances; 0 for fewer than two waypoints.
pub fn total_distance_nm(waypoints: &[Coordinate]) -> f64 {
    waypoints
        .windows(2)
        .map(|leg| haversine_nm(&leg[0], &leg[1]))
        .sum()
}

/// Hours to sail the route at the class hull speed.
///
/// `Ok(None)` when there are fewer than two waypoints, regardless of class.
pub fn eta_hours(
    waypoints: &[Coordinate],
    vessel_class: &str,
    hull_speeds: &HullSpeedTable,
) -> Result<Option<f64>, ServiceError> {
    if waypoints.len() < 2 {
        return Ok(None);
    }
    let speed = hull_speeds.hull_speed_kts(vessel_class)?;
    Ok(Some(total_distance_nm(waypoints) / speed))
}

/// Caller-owned, append-only waypoint list.
///
/// Waypoints are kept in insertion order with no deduplication; the only way
/// to remove one is [`Route::clear`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    waypoints: Vec<Coordinate>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, waypoint: Coordinate) {
        self.waypoints.push(waypoint);
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    pub fn waypoints(&self) -> &[Coordinate] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn total_distance_nm(&self) -> f64 {
        total_distance_nm(&self.waypoints)
    }

    pub fn eta_hours(
        &self,
        vessel_class: &str,
        hull_speeds: &HullSpeedTable,
    ) -> Result<Option<f64>, ServiceError> {
        eta_hours(&self.waypoints, vessel_class, hull_speeds)
    }
}
