//! # Marine Weather Fetching and Normalization
//!
//! Turns an Open-Meteo hourly forecast into a [`MarineReading`]: wind in knots,
//! the remaining fields copied through with their reported unit labels.
//!
//! ## Data Source
//! - **URL**: https://api.open-meteo.com/v1/forecast
//! - **Variables**: 10 m wind speed, gusts and direction; 2 m temperature and
//!   relative humidity; surface pressure; visibility
//! - **Units requested**: wind in km/h, converted here with [`KNOTS_PER_KMH`]
//!
//! ## Processing Pipeline
//! 1. **Validate**: reject out-of-range coordinates before any network call
//! 2. **Cache**: key `marine:lat=..&lon=..`; a hit returns immediately
//! 3. **Fetch**: hourly series for the coordinate
//! 4. **Normalize**: take the first sample; a missing field becomes `None`
//!    instead of failing the whole reading
//! 5. **Store**: only successful readings are cached
//!
//! Wave height is never fetched. It stays `None` here and is filled for
//! display from the Beaufort table via [`MarineReading::with_wave_height`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::beaufort;
use crate::cache::build_key;
use crate::config::WeatherConfig;
use crate::{CachePayload, Cached, ConditionsCache, Coordinate, ServiceError, KNOTS_PER_KMH};

const HOURLY_VARIABLES: &str = "wind_speed_10m,wind_gusts_10m,wind_direction_10m,\
temperature_2m,relative_humidity_2m,surface_pressure,visibility";

/// Raw hourly forecast, shaped like the Open-Meteo response.
///
/// Every array is time-aligned with `time`. Arrays may be shorter than
/// `time` or contain nulls; normalization tolerates both.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct HourlyForecast {
    #[serde(default)]
    pub hourly: Option<HourlySeries>,
    #[serde(default)]
    pub hourly_units: Option<HashMap<String, String>>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HourlySeries {
    pub time: Vec<String>,
    pub wind_speed_10m: Vec<Option<f64>>,
    pub wind_gusts_10m: Vec<Option<f64>>,
    pub wind_direction_10m: Vec<Option<f64>>,
    pub temperature_2m: Vec<Option<f64>>,
    pub relative_humidity_2m: Vec<Option<f64>>,
    pub surface_pressure: Vec<Option<f64>>,
    pub visibility: Vec<Option<f64>>,
}

/// Upstream weather collaborator.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Hourly series for `coordinate`. Transport and status failures are
    /// [`ServiceError::Upstream`].
    async fn hourly(&self, coordinate: Coordinate) -> Result<HourlyForecast, ServiceError>;
}

/// Unit labels attached to a reading.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarineUnits {
    pub wind_speed: String,
    pub wind_direction: Option<String>,
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub pressure: Option<String>,
    pub visibility: Option<String>,
}

/// Canonical marine conditions for one coordinate.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarineReading {
    pub coordinate: Coordinate,
    pub timestamp: Option<String>,
    pub wind_speed_kts: Option<f64>,
    pub wind_gust_kts: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure_hpa: Option<f64>,
    /// As reported; the unit is in `units.visibility`
    pub visibility: Option<f64>,
    pub wave_height: Option<String>,
    pub units: MarineUnits,
}

impl MarineReading {
    /// Attach the Beaufort wave-height descriptor for the current wind.
    pub fn with_wave_height(mut self) -> Self {
        self.wave_height = Some(beaufort::classify(self.wind_speed_kts).wave_height.to_string());
        self
    }
}

fn first(series: &[Option<f64>]) -> Option<f64> {
    series.first().copied().flatten()
}

/// Shape a raw forecast into a reading using its first (current) sample.
pub fn normalize_forecast(coordinate: Coordinate, forecast: &HourlyForecast) -> MarineReading {
    let empty = HourlySeries::default();
    let hourly = forecast.hourly.as_ref().unwrap_or(&empty);
    let unit = |name: &str| {
        forecast
            .hourly_units
            .as_ref()
            .and_then(|units| units.get(name))
            .cloned()
    };

    MarineReading {
        coordinate,
        timestamp: hourly.time.first().cloned(),
        wind_speed_kts: first(&hourly.wind_speed_10m).map(|kmh| kmh * KNOTS_PER_KMH),
        wind_gust_kts: first(&hourly.wind_gusts_10m).map(|kmh| kmh * KNOTS_PER_KMH),
        wind_direction_deg: first(&hourly.wind_direction_10m),
        temperature_c: first(&hourly.temperature_2m),
        humidity: first(&hourly.relative_humidity_2m),
        pressure_hpa: first(&hourly.surface_pressure),
        visibility: first(&hourly.visibility),
        wave_height: None,
        units: MarineUnits {
            wind_speed: "kn".to_string(),
            wind_direction: unit("wind_direction_10m"),
            temperature: unit("temperature_2m"),
            humidity: unit("relative_humidity_2m"),
            pressure: unit("surface_pressure"),
            visibility: unit("visibility"),
        },
    }
}

/// Cache-first marine query.
#[derive(Clone)]
pub struct MarineNormalizer {
    source: Arc<dyn WeatherSource>,
    cache: Arc<ConditionsCache>,
}

impl MarineNormalizer {
    pub fn new(source: Arc<dyn WeatherSource>, cache: Arc<ConditionsCache>) -> Self {
        Self { source, cache }
    }

    /// Current conditions at `lat`, `lon`.
    ///
    /// Concurrent misses for the same coordinate each go upstream; whichever
    /// stores last is what later hits see.
    pub async fn fetch(&self, lat: f64, lon: f64) -> Result<Cached<MarineReading>, ServiceError> {
        let coordinate = Coordinate::new(lat, lon)?;
        // -0.0 and 0.0 are the same point; adding zero folds them to one key
        let key = build_key("marine", [("lat", lat + 0.0), ("lon", lon + 0.0)]);

        if let Some(CachePayload::Marine(reading)) = self.cache.get(&key) {
            tracing::debug!(%key, "marine cache hit");
            return Ok(Cached::hit(reading));
        }

        tracing::info!(lat, lon, "fetching marine forecast");
        let forecast = self.source.hourly(coordinate).await.map_err(|e| {
            tracing::warn!(lat, lon, "marine forecast fetch failed: {}", e);
            e
        })?;

        let reading = normalize_forecast(coordinate, &forecast);
        self.cache.set(key, CachePayload::Marine(reading.clone()));
        Ok(Cached::miss(reading))
    }
}

/// Open-Meteo forecast client.
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn hourly(&self, coordinate: Coordinate) -> Result<HourlyForecast, ServiceError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", coordinate.lat.to_string()),
                ("longitude", coordinate.lon.to_string()),
                ("hourly", HOURLY_VARIABLES.to_string()),
                ("wind_speed_unit", "kmh".to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Upstream(format!(
                "weather provider returned {}",
                status
            )));
        }

        Ok(response.json::<HourlyForecast>().await?)
    }
}
