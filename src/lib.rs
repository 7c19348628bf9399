//! # Bay Conditions Core Library
//!
//! This library provides the data layer and the sailing computations behind the
//! Bay Conditions service: marine weather and tide predictions for San Francisco
//! Bay harbors, a Beaufort wind-force classifier, and a route distance/ETA
//! planner.
//!
//! ## Design Philosophy
//!
//! ### Normalize Once, Cache the Result
//! Upstream providers speak their own dialects (km/h wind, string tide heights,
//! single-letter event types). Each normalizer converts the raw payload into a
//! canonical shape exactly once and stores that shape in the [`cache`], so a
//! cache hit never repeats unit conversion or filtering.
//!
//! ### Explicit Shared State
//! The cache is a constructed value owned by the application state and passed
//! by `Arc` to whichever component serves requests. There is no process-global
//! store, which keeps every test isolated.
//!
//! ### Lookup Tables Are Data
//! The Beaufort wave-height descriptors and the per-vessel hull speeds are
//! approximations, not physical models. Both live in plain tables that can be
//! swapped out through configuration.
//!
//! ### Data Flow
//! 1. **Request**: caller supplies coordinates or tide parameters
//! 2. **Cache check**: canonical key built from the parameters
//! 3. **Miss**: fetch upstream → normalize → store → return `cached: false`
//! 4. **Hit**: return stored reading with `cached: true`
//! 5. **Presentation**: wind speed flows into [`beaufort`], waypoints into [`route`]
//!
//! ## Core Types
//! - [`Coordinate`]: validated latitude/longitude pair
//! - [`Cached`]: response envelope carrying the cache-hit marker
//! - [`MarineReading`](marine_data::MarineReading) and
//!   [`TidePrediction`](tide_data::TidePrediction): normalized payloads

use serde::{Deserialize, Serialize};

pub mod beaufort;
pub mod cache;
pub mod config;
pub mod error;
pub mod harbors;
pub mod marine_data;
pub mod renderer;
pub mod route;
pub mod server;
pub mod tide_data;

pub use error::ServiceError;

/// Kilometers (per hour) to nautical miles (per hour, i.e. knots).
///
/// Shared by the wind normalizer and the route planner so both conversions
/// stay in lockstep.
pub const KNOTS_PER_KMH: f64 = 0.539957;

/// A geographic position in decimal degrees.
///
/// Construction through [`Coordinate::new`] enforces `lat ∈ [-90, 90]` and
/// `lon ∈ [-180, 180]`. The fields stay public so serde can round-trip request
/// bodies; call [`Coordinate::validate`] on anything that did not come from
/// `new`.
///
/// # Example
/// ```
/// use bay_conditions_lib::Coordinate;
///
/// let sausalito = Coordinate::new(37.8591, -122.4853).unwrap();
/// assert_eq!(sausalito.lat, 37.8591);
///
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, positive north
    pub lat: f64,
    /// Longitude in degrees, positive east
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting out-of-range or non-finite values.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ServiceError> {
        let coord = Coordinate { lat, lon };
        coord.validate()?;
        Ok(coord)
    }

    /// Check both components against their valid ranges.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(ServiceError::Validation(format!(
                "lat must be within [-90, 90], got {}",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(ServiceError::Validation(format!(
                "lon must be within [-180, 180], got {}",
                self.lon
            )));
        }
        Ok(())
    }
}

/// What the normalizers store in the shared cache.
#[derive(Clone, Debug)]
pub enum CachePayload {
    Marine(marine_data::MarineReading),
    Tides(tide_data::TidePrediction),
}

/// The one cache instance shared by both normalizers.
pub type ConditionsCache = cache::ExpiringCache<CachePayload>;

/// Response envelope returned by both normalizers.
///
/// `cached` is true when the payload was served from the cache without an
/// upstream call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cached<T> {
    pub cached: bool,
    pub data: T,
}

impl<T> Cached<T> {
    pub fn hit(data: T) -> Self {
        Cached { cached: true, data }
    }

    pub fn miss(data: T) -> Self {
        Cached {
            cached: false,
            data,
        }
    }
}
