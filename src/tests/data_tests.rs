//! # Data Layer Test Suite
//!
//! Exercises the normalizers together with the shared cache, and the real HTTP
//! clients against a local mock server. Tests run without network access.

use std::sync::Arc;
use std::time::Duration;

use bay_conditions_lib::config::{TideConfig, WeatherConfig};
use bay_conditions_lib::marine_data::{MarineNormalizer, OpenMeteoClient, WeatherSource};
use bay_conditions_lib::tide_data::{
    NoaaClient, TideKind, TideNormalizer, TideParams, TideQuery, TideRequest, TideSource,
};
use bay_conditions_lib::{ConditionsCache, Coordinate, ServiceError};
use chrono::{TimeZone, Utc};
use tokio::sync::Barrier;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{StaticTides, StaticWeather};

fn cache(max_items: usize) -> Arc<ConditionsCache> {
    Arc::new(ConditionsCache::new(Duration::from_millis(60_000), max_items))
}

/// Two simultaneous misses for one coordinate both reach upstream.
///
/// The barrier only opens once both fetches are inside the source, so the
/// test would hang if the normalizer collapsed them into one call.
#[tokio::test]
async fn concurrent_misses_each_fetch_upstream() {
    let barrier = Arc::new(Barrier::new(2));
    let source = StaticWeather::gated(20.0, barrier);
    let cache = cache(10);
    let marine = MarineNormalizer::new(source.clone(), cache.clone());

    let (a, b) = tokio::join!(marine.fetch(37.8, -122.4), marine.fetch(37.8, -122.4));
    assert!(!a.unwrap().cached);
    assert!(!b.unwrap().cached);
    assert_eq!(source.calls(), 2);
    assert_eq!(cache.len(), 1, "last writer wins on the same key");

    let third = marine.fetch(37.8, -122.4).await.unwrap();
    assert!(third.cached);
}

/// Marine and tide entries live in one cache and one reset clears both.
#[tokio::test]
async fn normalizers_share_one_cache() {
    let cache = cache(10);
    let marine = MarineNormalizer::new(StaticWeather::new(10.0), cache.clone());
    let tides = TideNormalizer::new(StaticTides::new(), cache.clone(), TideConfig::default());

    marine.fetch(37.8591, -122.4853).await.unwrap();
    tides.fetch(&TideQuery::for_station("9414806")).await.unwrap();
    assert_eq!(cache.len(), 2);

    assert_eq!(cache.clear(), 2);
    let again = marine.fetch(37.8591, -122.4853).await.unwrap();
    assert!(!again.cached);
}

/// Capacity pressure evicts the least recently used reading.
#[tokio::test]
async fn capacity_pressure_forces_refetch_of_oldest() {
    let source = StaticWeather::new(10.0);
    let marine = MarineNormalizer::new(source.clone(), cache(2));

    marine.fetch(37.80, -122.40).await.unwrap();
    marine.fetch(37.81, -122.41).await.unwrap();
    marine.fetch(37.82, -122.42).await.unwrap();
    assert_eq!(source.calls(), 3);

    // the newest two are still cached
    assert!(marine.fetch(37.82, -122.42).await.unwrap().cached);
    assert!(marine.fetch(37.81, -122.41).await.unwrap().cached);
    // the oldest was evicted
    assert!(!marine.fetch(37.80, -122.40).await.unwrap().cached);
    assert_eq!(source.calls(), 4);
}

/// Readings expire after the configured TTL.
#[tokio::test(start_paused = true)]
async fn readings_expire_after_ttl() {
    let source = StaticWeather::new(10.0);
    let marine = MarineNormalizer::new(source.clone(), cache(10));

    marine.fetch(37.8, -122.4).await.unwrap();
    tokio::time::advance(Duration::from_millis(30_000)).await;
    assert!(marine.fetch(37.8, -122.4).await.unwrap().cached);

    tokio::time::advance(Duration::from_millis(30_000)).await;
    assert!(!marine.fetch(37.8, -122.4).await.unwrap().cached);
    assert_eq!(source.calls(), 2);
}

/// Tide upstream failure leaves nothing behind in the cache.
#[tokio::test]
async fn tide_failure_is_not_cached() {
    let cache = cache(10);
    let tides = TideNormalizer::new(StaticTides::failing(), cache.clone(), TideConfig::default());
    let err = tides.fetch(&TideQuery::default()).await.unwrap_err();
    assert_eq!(err.code(), "UPSTREAM_ERROR");
    assert!(cache.is_empty());
}

fn weather_config(server: &MockServer) -> WeatherConfig {
    WeatherConfig {
        base_url: format!("{}/v1/forecast", server.uri()),
        timeout_secs: 5,
    }
}

fn tide_config(server: &MockServer) -> TideConfig {
    TideConfig {
        base_url: format!("{}/api/prod/datagetter", server.uri()),
        time_zone: "gmt".to_string(),
        ..TideConfig::default()
    }
}

fn tide_request() -> TideRequest {
    let params: TideParams = TideQuery::default()
        .resolve(&TideConfig {
            time_zone: "gmt".to_string(),
            ..TideConfig::default()
        })
        .unwrap();
    TideRequest::lookahead(params, Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn open_meteo_client_parses_hourly_series() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "37.8591"))
        .and(query_param("wind_speed_unit", "kmh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": 37.86,
            "longitude": -122.49,
            "hourly_units": {
                "time": "iso8601",
                "wind_speed_10m": "km/h",
                "temperature_2m": "°C",
                "visibility": "m"
            },
            "hourly": {
                "time": ["2025-06-01T00:00", "2025-06-01T01:00"],
                "wind_speed_10m": [18.5, 20.1],
                "wind_gusts_10m": [null, 31.0],
                "wind_direction_10m": [265, 270],
                "temperature_2m": [13.2, 13.0],
                "visibility": [24140.0, 24140.0]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenMeteoClient::new(&weather_config(&server)).unwrap();
    let coordinate = Coordinate::new(37.8591, -122.4853).unwrap();
    let forecast = client.hourly(coordinate).await.unwrap();

    let reading = bay_conditions_lib::marine_data::normalize_forecast(coordinate, &forecast);
    assert!((reading.wind_speed_kts.unwrap() - 18.5 * 0.539957).abs() < 1e-9);
    assert_eq!(reading.wind_gust_kts, None);
    assert_eq!(reading.wind_direction_deg, Some(265.0));
    assert_eq!(reading.humidity, None);
    assert_eq!(reading.units.temperature.as_deref(), Some("°C"));
}

#[tokio::test]
async fn open_meteo_error_status_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = OpenMeteoClient::new(&weather_config(&server)).unwrap();
    let err = client
        .hourly(Coordinate::new(37.8, -122.4).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream(_)));
}

#[tokio::test]
async fn noaa_client_forwards_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/prod/datagetter"))
        .and(query_param("station", "9414290"))
        .and(query_param("datum", "MLLW"))
        .and(query_param("interval", "hilo"))
        .and(query_param("begin_date", "20250601 12:00"))
        .and(query_param("end_date", "20250602 12:00"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "predictions": [
                {"t": "2025-06-01 13:02", "v": "5.612", "type": "H"},
                {"t": "2025-06-01 19:47", "v": "-0.311", "type": "L"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NoaaClient::new(&tide_config(&server)).unwrap();
    let raw = client.predictions(&tide_request()).await.unwrap();
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0].t, "2025-06-01 13:02");
    assert_eq!(raw[1].kind.as_deref(), Some("L"));
}

#[tokio::test]
async fn noaa_in_band_error_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/prod/datagetter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": {"message": "No Predictions data was found."}
        })))
        .mount(&server)
        .await;

    let client = NoaaClient::new(&tide_config(&server)).unwrap();
    let err = client.predictions(&tide_request()).await.unwrap_err();
    assert!(err.to_string().contains("No Predictions data was found"));
}

#[tokio::test]
async fn noaa_failure_through_normalizer_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = cache(10);
    let config = tide_config(&server);
    let tides = TideNormalizer::new(
        Arc::new(NoaaClient::new(&config).unwrap()),
        cache.clone(),
        config,
    );
    let err = tides.fetch(&TideQuery::default()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Upstream(_)));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn noaa_series_normalizes_end_to_end() {
    let server = MockServer::start().await;
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "predictions": [
                {"t": "2025-06-01 06:10", "v": "-0.4", "type": "L"},
                {"t": "2025-06-01 11:58", "v": "5.1", "type": "H"},
                {"t": "2025-06-01 18:40", "v": "2.9", "type": "L"}
            ]
        })))
        .mount(&server)
        .await;

    let config = tide_config(&server);
    let tides = TideNormalizer::new(Arc::new(NoaaClient::new(&config).unwrap()), cache(10), config);
    let result = tides.fetch_at(&TideQuery::default(), now).await.unwrap();

    assert_eq!(result.data.raw_count, 3);
    assert_eq!(result.data.upcoming.len(), 2);
    assert_eq!(result.data.upcoming[0].kind, Some(TideKind::High));
    assert_eq!(result.data.upcoming[1].value_ft, Some(2.9));
}
