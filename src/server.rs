//! HTTP boundary: routes, shared state and error mapping.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /api/marine?lat&lon` | marine query |
//! | `GET /api/tides?station&product&time_zone&units&datum&interval&range` | tide query |
//! | `POST /api/cache/reset` | clear the cache |
//! | `GET /api/cache/stats` | cache counters |
//! | `GET /api/harbors` | harbor catalog |
//! | `GET /api/harbors/:name/conditions` | marine + Beaufort + tides for a harbor |
//! | `GET /api/beaufort?speed&scale` | classify a wind speed |
//! | `POST /api/route` | route distance and ETA |
//! | `GET /health` | liveness |

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use crate::beaufort::{self, BeaufortBand, GaugeScale};
use crate::cache::CacheStatsSnapshot;
use crate::config::Config;
use crate::harbors::{Harbor, HarborCatalog};
use crate::marine_data::{MarineNormalizer, MarineReading, OpenMeteoClient, WeatherSource};
use crate::route::{leg_distances_nm, HullSpeedTable, Route};
use crate::tide_data::{NoaaClient, TideNormalizer, TidePrediction, TideQuery, TideSource};
use crate::{Cached, ConditionsCache, Coordinate, ServiceError};

/// Shared application state.
pub struct AppState {
    pub cache: Arc<ConditionsCache>,
    pub marine: MarineNormalizer,
    pub tides: TideNormalizer,
    pub harbors: HarborCatalog,
    pub hull_speeds: HullSpeedTable,
}

/// Everything known about one harbor right now.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarborConditions {
    pub harbor: Harbor,
    pub marine: Cached<MarineReading>,
    pub beaufort: &'static BeaufortBand,
    pub tides: Cached<TidePrediction>,
}

impl AppState {
    /// Build state around explicit upstream sources.
    pub fn new(
        config: &Config,
        weather: Arc<dyn WeatherSource>,
        tides: Arc<dyn TideSource>,
    ) -> Result<Self, ServiceError> {
        let cache = Arc::new(ConditionsCache::new(
            config.cache_ttl(),
            config.cache.max_items,
        ));

        Ok(Self {
            marine: MarineNormalizer::new(weather, cache.clone()),
            tides: TideNormalizer::new(tides, cache.clone(), config.tides.clone()),
            harbors: config.harbor_catalog(),
            hull_speeds: config.hull_speed_table()?,
            cache,
        })
    }

    /// Build state with the production Open-Meteo and NOAA clients.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let weather = Arc::new(OpenMeteoClient::new(&config.weather)?);
        let tides = Arc::new(NoaaClient::new(&config.tides)?);
        Self::new(config, weather, tides)
    }

    /// Marine reading, Beaufort band and tides for a named harbor.
    pub async fn harbor_conditions(&self, name: &str) -> Result<HarborConditions, ServiceError> {
        let harbor = self.harbors.lookup(name)?.clone();

        let mut marine = self.marine.fetch(harbor.lat, harbor.lon).await?;
        marine.data = marine.data.with_wave_height();
        let band = beaufort::classify(marine.data.wind_speed_kts);

        let tides = self
            .tides
            .fetch(&TideQuery::for_station(harbor.tide_station.clone()))
            .await?;

        Ok(HarborConditions {
            harbor,
            marine,
            beaufort: band,
            tides,
        })
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Domain(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Malformed query strings and bodies are validation failures, reported in
/// the same JSON shape as every other error.
fn rejected(rejection: impl std::fmt::Display) -> ServiceError {
    ServiceError::Validation(rejection.to_string())
}

#[derive(Debug, Deserialize)]
pub struct MarineParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// GET /api/marine
#[instrument(skip(state))]
pub async fn marine_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: Result<Query<MarineParams>, QueryRejection>,
) -> Result<Json<Cached<MarineReading>>, ServiceError> {
    let Query(params) = params.map_err(rejected)?;
    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return Err(ServiceError::Validation(
            "lat and lon are required".to_string(),
        ));
    };
    Ok(Json(state.marine.fetch(lat, lon).await?))
}

/// GET /api/tides
#[instrument(skip(state))]
pub async fn tides_handler(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<TideQuery>, QueryRejection>,
) -> Result<Json<Cached<TidePrediction>>, ServiceError> {
    let Query(query) = query.map_err(rejected)?;
    Ok(Json(state.tides.fetch(&query).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub ok: bool,
    pub cleared: usize,
}

/// POST /api/cache/reset
#[instrument(skip(state))]
pub async fn cache_reset_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<ResetResponse> {
    info!("Clearing conditions cache");
    let cleared = state.cache.clear();
    Json(ResetResponse { ok: true, cleared })
}

/// GET /api/cache/stats
pub async fn cache_stats_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<CacheStatsSnapshot> {
    Json(state.cache.stats())
}

/// GET /api/harbors
pub async fn harbors_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Vec<Harbor>> {
    Json(state.harbors.all().to_vec())
}

/// GET /api/harbors/:name/conditions
#[instrument(skip(state))]
pub async fn harbor_conditions_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<HarborConditions>, ServiceError> {
    Ok(Json(state.harbor_conditions(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct BeaufortParams {
    pub speed: Option<f64>,
    pub scale: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaufortResponse {
    pub speed_kts: Option<f64>,
    pub band: &'static BeaufortBand,
    pub scale: GaugeScale,
    pub gauge_position: f64,
}

/// GET /api/beaufort
pub async fn beaufort_handler(
    params: Result<Query<BeaufortParams>, QueryRejection>,
) -> Result<Json<BeaufortResponse>, ServiceError> {
    let Query(params) = params.map_err(rejected)?;
    let scale = match params.scale.as_deref() {
        Some(name) => name.parse::<GaugeScale>()?,
        None => GaugeScale::default(),
    };

    Ok(Json(BeaufortResponse {
        speed_kts: params.speed,
        band: beaufort::classify(params.speed),
        scale,
        gauge_position: scale.position(params.speed),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub waypoints: Vec<Coordinate>,
    pub vessel_class: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub waypoint_count: usize,
    pub legs_nm: Vec<f64>,
    pub total_distance_nm: f64,
    pub eta_hours: Option<f64>,
}

/// POST /api/route
#[instrument(skip(state, request))]
pub async fn route_handler(
    Extension(state): Extension<Arc<AppState>>,
    request: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<RouteResponse>, ServiceError> {
    let Json(request) = request.map_err(rejected)?;
    let mut route = Route::new();
    for waypoint in request.waypoints {
        waypoint.validate()?;
        route.append(waypoint);
    }

    Ok(Json(RouteResponse {
        waypoint_count: route.len(),
        legs_nm: leg_distances_nm(route.waypoints()),
        total_distance_nm: route.total_distance_nm(),
        eta_hours: route.eta_hours(&request.vessel_class, &state.hull_speeds)?,
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Assemble the router with tracing and permissive CORS.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/marine", get(marine_handler))
        .route("/api/tides", get(tides_handler))
        .route("/api/cache/reset", post(cache_reset_handler))
        .route("/api/cache/stats", get(cache_stats_handler))
        .route("/api/harbors", get(harbors_handler))
        .route(
            "/api/harbors/:name/conditions",
            get(harbor_conditions_handler),
        )
        .route("/api/beaufort", get(beaufort_handler))
        .route("/api/route", post(route_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `listen_addr` and serve until the process stops.
pub async fn serve(state: Arc<AppState>, listen_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("Bay conditions listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
