use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use broker_feed_core::candle::Candle;
use broker_feed_core::error::FeedError;
use broker_feed_core::tick::Tick;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::service::FeedService;

/// Raw query strings; numbers are parsed by hand so a malformed value is an
/// `InvalidParameter` rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct OhlcQuery {
    pub since: Option<String>,
    pub batch_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TicksQuery {
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub symbol: String,
    pub timeframe: String,
}

fn parse_since(raw: Option<&str>) -> Result<i64, FeedError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| FeedError::invalid_parameter("since", format!("'{value}' is not an integer"))),
    }
}

fn parse_batch_size(raw: Option<&str>, default: usize) -> Result<usize, FeedError> {
    let batch_size = match raw.map(str::trim) {
        None | Some("") => default,
        Some(value) => value.parse::<usize>().map_err(|_| {
            FeedError::invalid_parameter(
                "batch_size",
                format!("'{value}' is not a non-negative integer"),
            )
        })?,
    };
    if batch_size == 0 {
        return Err(FeedError::invalid_parameter("batch_size", "must be at least 1"));
    }
    Ok(batch_size)
}

/// GET /get_ohlc
pub async fn get_ohlc(
    State(service): State<Arc<FeedService>>,
    Query(query): Query<OhlcQuery>,
) -> Result<Json<Vec<Candle>>, ApiError> {
    let since = parse_since(query.since.as_deref())?;
    let batch_size = parse_batch_size(query.batch_size.as_deref(), service.default_batch_size())?;

    let candles = service.candles_since(since, batch_size).await?;
    info!("get_ohlc since={since} batch_size={batch_size}: {} candle(s)", candles.len());
    Ok(Json(candles))
}

/// GET /get_ticks
pub async fn get_ticks(
    State(service): State<Arc<FeedService>>,
    Query(query): Query<TicksQuery>,
) -> Result<Json<Vec<Tick>>, ApiError> {
    let since = parse_since(query.since.as_deref())?;

    let ticks = service.ticks_since(since).await?;
    info!("get_ticks since={since}: {} tick(s)", ticks.len());
    Ok(Json(ticks))
}

/// GET /health
pub async fn health(State(service): State<Arc<FeedService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        symbol: service.symbol().to_string(),
        timeframe: service.timeframe().to_string(),
    })
}

pub fn create_router(service: Arc<FeedService>) -> Router {
    Router::new()
        .route("/get_ohlc", get(get_ohlc))
        .route("/get_ticks", get(get_ticks))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
