//! Cross-module tests: normalizers sharing one cache, the HTTP clients against a
//! mock server, and the router end to end. Upstream providers are replaced by
//! the in-memory sources below.

mod data_tests;

use async_trait::async_trait;
use bay_conditions_lib::marine_data::{HourlyForecast, HourlySeries, WeatherSource};
use bay_conditions_lib::tide_data::{RawPrediction, TideRequest, TideSource};
use bay_conditions_lib::{Coordinate, ServiceError};
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

/// Weather source returning a fixed wind speed, optionally failing or
/// waiting on a barrier so several fetches can be held in flight together.
pub struct StaticWeather {
    pub calls: AtomicUsize,
    pub wind_kmh: f64,
    pub fail: bool,
    pub barrier: Option<Arc<Barrier>>,
}

impl StaticWeather {
    pub fn new(wind_kmh: f64) -> Arc<Self> {
        Arc::new(StaticWeather {
            calls: AtomicUsize::new(0),
            wind_kmh,
            fail: false,
            barrier: None,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(StaticWeather {
            calls: AtomicUsize::new(0),
            wind_kmh: 0.0,
            fail: true,
            barrier: None,
        })
    }

    pub fn gated(wind_kmh: f64, barrier: Arc<Barrier>) -> Arc<Self> {
        Arc::new(StaticWeather {
            calls: AtomicUsize::new(0),
            wind_kmh,
            fail: false,
            barrier: Some(barrier),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for StaticWeather {
    async fn hourly(&self, _: Coordinate) -> Result<HourlyForecast, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail {
            return Err(ServiceError::Upstream("weather provider returned 503".into()));
        }
        Ok(HourlyForecast {
            hourly: Some(HourlySeries {
                time: vec!["2025-06-01T10:00".into()],
                wind_speed_10m: vec![Some(self.wind_kmh)],
                wind_gusts_10m: vec![Some(self.wind_kmh * 1.5)],
                wind_direction_10m: vec![Some(250.0)],
                temperature_2m: vec![Some(15.0)],
                ..HourlySeries::default()
            }),
            hourly_units: None,
        })
    }
}

/// Tide source producing one event two hours ago and one three hours ahead,
/// timestamped in GMT relative to the real clock.
pub struct StaticTides {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl StaticTides {
    pub fn new() -> Arc<Self> {
        Arc::new(StaticTides {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(StaticTides {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TideSource for StaticTides {
    async fn predictions(&self, _: &TideRequest) -> Result<Vec<RawPrediction>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ServiceError::Upstream("tide provider returned 500".into()));
        }
        let at = |hours: i64| {
            (Utc::now() + Duration::hours(hours))
                .format("%Y-%m-%d %H:%M")
                .to_string()
        };
        Ok(vec![
            RawPrediction {
                t: at(-2),
                v: serde_json::json!("0.8"),
                kind: Some("L".into()),
            },
            RawPrediction {
                t: at(3),
                v: serde_json::json!("5.6"),
                kind: Some("H".into()),
            },
        ])
    }
}
