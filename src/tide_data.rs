//! # NOAA Tide Prediction Fetching and Normalization
//!
//! This module fetches high/low tide predictions from NOAA's CO-OPS data API
//! and reduces them to the events that are still ahead of the caller.
//!
//! ## Data Source
//!
//! ### NOAA Tides and Currents
//! - **URL**: https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
//! - **Station**: 9414290 (San Francisco) unless the request names another
//! - **Format**: JSON `{"predictions": [{"t", "v", "type"}, ...]}`
//! - **Window**: 24 hours starting at the current instant
//!
//! ### Data Processing Pipeline
//! 1. **Resolve**: fill omitted query parameters from configuration
//! 2. **Cache**: key over every resolved parameter, order-independent
//! 3. **Fetch**: predictions for `[now, now + 24h]`
//! 4. **Label**: `H` → High, `L` → Low, anything else unset
//! 5. **Filter**: drop events more than 5 minutes in the past
//! 6. **Store**: `{station, upcoming, rawCount}` for the cache TTL
//!
//! ## Time Zones
//! NOAA reports `t` as a wall-clock string in the requested `time_zone`.
//! `gmt` is read as UTC; `lst`/`lst_ldt` are read in the server's local zone,
//! which is expected to be the Bay's.
//!
//! ## Error Handling
//! Transport failures, non-success statuses and NOAA's in-band `error`
//! object all surface as [`ServiceError::Upstream`]. Nothing is cached on
//! failure.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::build_key;
use crate::config::TideConfig;
use crate::{CachePayload, Cached, ConditionsCache, ServiceError};

/// How far ahead predictions are requested.
pub const LOOKAHEAD_HOURS: i64 = 24;

/// Events this far in the past are still reported, covering request latency
/// and clock skew.
pub const PAST_GRACE_MINUTES: i64 = 5;

const NOAA_REQUEST_TIME: &str = "%Y%m%d %H:%M";
const NOAA_EVENT_TIME: &str = "%Y-%m-%d %H:%M";

/// Tide query as supplied by a caller; every field is optional.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TideQuery {
    pub station: Option<String>,
    pub product: Option<String>,
    pub time_zone: Option<String>,
    pub units: Option<String>,
    pub datum: Option<String>,
    pub interval: Option<String>,
    pub range: Option<String>,
}

/// Tide query with defaults applied. These values go upstream unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct TideParams {
    pub station: String,
    pub product: String,
    pub time_zone: String,
    pub units: String,
    pub datum: String,
    pub interval: String,
    pub range: String,
}

impl TideQuery {
    pub fn for_station(station: impl Into<String>) -> Self {
        TideQuery {
            station: Some(station.into()),
            ..Self::default()
        }
    }

    /// Apply configured defaults and validate the station id.
    pub fn resolve(&self, defaults: &TideConfig) -> Result<TideParams, ServiceError> {
        let pick = |value: &Option<String>, fallback: &String| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback.as_str())
                .to_string()
        };

        let params = TideParams {
            station: pick(&self.station, &defaults.station),
            product: pick(&self.product, &defaults.product),
            time_zone: pick(&self.time_zone, &defaults.time_zone),
            units: pick(&self.units, &defaults.units),
            datum: pick(&self.datum, &defaults.datum),
            interval: pick(&self.interval, &defaults.interval),
            range: pick(&self.range, &defaults.range),
        };

        if !params.station.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ServiceError::Validation(format!(
                "station must be alphanumeric, got '{}'",
                params.station
            )));
        }
        Ok(params)
    }
}

impl TideParams {
    fn cache_key(&self) -> String {
        build_key(
            "tides",
            [
                ("station", &self.station),
                ("product", &self.product),
                ("time_zone", &self.time_zone),
                ("units", &self.units),
                ("datum", &self.datum),
                ("interval", &self.interval),
                ("range", &self.range),
            ],
        )
    }

    fn is_utc(&self) -> bool {
        self.time_zone.eq_ignore_ascii_case("gmt")
    }
}

/// Everything the tide collaborator needs for one fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct TideRequest {
    pub params: TideParams,
    /// `yyyyMMdd HH:mm` in the request time zone
    pub begin_date: String,
    pub end_date: String,
}

impl TideRequest {
    /// Lookahead window starting at `now`.
    pub fn lookahead(params: TideParams, now: DateTime<Utc>) -> Self {
        let end = now + Duration::hours(LOOKAHEAD_HOURS);
        let format = |instant: DateTime<Utc>| {
            if params.is_utc() {
                instant.format(NOAA_REQUEST_TIME).to_string()
            } else {
                instant
                    .with_timezone(&Local)
                    .format(NOAA_REQUEST_TIME)
                    .to_string()
            }
        };

        TideRequest {
            begin_date: format(now),
            end_date: format(end),
            params,
        }
    }
}

/// One upstream prediction as NOAA sends it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawPrediction {
    pub t: String,
    /// Usually a decimal string; numbers are accepted too
    pub v: serde_json::Value,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Upstream tide collaborator.
#[async_trait]
pub trait TideSource: Send + Sync {
    async fn predictions(&self, request: &TideRequest) -> Result<Vec<RawPrediction>, ServiceError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum TideKind {
    High,
    Low,
}

/// A labelled tide event still relevant to the caller.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TideEvent {
    /// Upstream timestamp, verbatim
    pub time: String,
    pub value_ft: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<TideKind>,
}

/// Normalized predictions for a station.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TidePrediction {
    pub station: String,
    pub upcoming: Vec<TideEvent>,
    /// Length of the series before filtering
    pub raw_count: usize,
}

fn parse_value(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_kind(kind: Option<&str>) -> Option<TideKind> {
    match kind {
        Some("H") => Some(TideKind::High),
        Some("L") => Some(TideKind::Low),
        _ => None,
    }
}

fn parse_event_time(t: &str, utc: bool) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(t.trim(), NOAA_EVENT_TIME).ok()?;
    if utc {
        Some(Utc.from_utc_datetime(&naive))
    } else {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }
}

/// Label the raw series and keep events no older than the grace window.
///
/// Events whose time cannot be parsed are dropped; they still count toward
/// `raw_count`.
pub fn normalize_predictions(
    params: &TideParams,
    raw: &[RawPrediction],
    now: DateTime<Utc>,
) -> TidePrediction {
    let cutoff = now - Duration::minutes(PAST_GRACE_MINUTES);
    let utc = params.is_utc();

    let upcoming = raw
        .iter()
        .filter(|p| parse_event_time(&p.t, utc).is_some_and(|at| at >= cutoff))
        .map(|p| TideEvent {
            time: p.t.clone(),
            value_ft: parse_value(&p.v),
            kind: parse_kind(p.kind.as_deref()),
        })
        .collect();

    TidePrediction {
        station: params.station.clone(),
        upcoming,
        raw_count: raw.len(),
    }
}

/// Cache-first tide query.
#[derive(Clone)]
pub struct TideNormalizer {
    source: Arc<dyn TideSource>,
    cache: Arc<ConditionsCache>,
    defaults: TideConfig,
}

impl TideNormalizer {
    pub fn new(source: Arc<dyn TideSource>, cache: Arc<ConditionsCache>, defaults: TideConfig) -> Self {
        Self {
            source,
            cache,
            defaults,
        }
    }

    pub async fn fetch(&self, query: &TideQuery) -> Result<Cached<TidePrediction>, ServiceError> {
        self.fetch_at(query, Utc::now()).await
    }

    /// Same as [`fetch`](Self::fetch) with an explicit notion of "now".
    pub async fn fetch_at(
        &self,
        query: &TideQuery,
        now: DateTime<Utc>,
    ) -> Result<Cached<TidePrediction>, ServiceError> {
        let params = query.resolve(&self.defaults)?;
        let key = params.cache_key();

        if let Some(CachePayload::Tides(prediction)) = self.cache.get(&key) {
            tracing::debug!(%key, "tide cache hit");
            return Ok(Cached::hit(prediction));
        }

        let request = TideRequest::lookahead(params, now);
        tracing::info!(
            station = %request.params.station,
            begin = %request.begin_date,
            end = %request.end_date,
            "fetching tide predictions"
        );
        let raw = self.source.predictions(&request).await.map_err(|e| {
            tracing::warn!(station = %request.params.station, "tide fetch failed: {}", e);
            e
        })?;

        let prediction = normalize_predictions(&request.params, &raw, now);
        tracing::debug!(
            raw = prediction.raw_count,
            upcoming = prediction.upcoming.len(),
            "normalized tide predictions"
        );
        self.cache.set(key, CachePayload::Tides(prediction.clone()));
        Ok(Cached::miss(prediction))
    }
}

#[derive(Deserialize)]
struct NoaaResponse {
    #[serde(default)]
    predictions: Option<Vec<RawPrediction>>,
    #[serde(default)]
    error: Option<NoaaError>,
}

#[derive(Deserialize)]
struct NoaaError {
    #[serde(default)]
    message: String,
}

/// NOAA CO-OPS data getter client.
pub struct NoaaClient {
    client: Client,
    base_url: String,
}

impl NoaaClient {
    pub fn new(config: &TideConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl TideSource for NoaaClient {
    async fn predictions(&self, request: &TideRequest) -> Result<Vec<RawPrediction>, ServiceError> {
        let params = &request.params;
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("station", params.station.as_str()),
                ("product", params.product.as_str()),
                ("time_zone", params.time_zone.as_str()),
                ("units", params.units.as_str()),
                ("datum", params.datum.as_str()),
                ("interval", params.interval.as_str()),
                ("range", params.range.as_str()),
                ("begin_date", request.begin_date.as_str()),
                ("end_date", request.end_date.as_str()),
                ("format", "json"),
                ("application", "bay-conditions"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Upstream(format!(
                "tide provider returned {}",
                status
            )));
        }

        let body = response.json::<NoaaResponse>().await?;
        if let Some(error) = body.error {
            return Err(ServiceError::Upstream(format!(
                "tide provider error: {}",
                error.message
            )));
        }
        body.predictions
            .ok_or_else(|| ServiceError::Upstream("tide provider sent no predictions".to_string()))
    }
}
