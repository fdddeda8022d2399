use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::get,
    Json, Router,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::render::{render_dashboard, InstrumentPanel};
use crate::config::ReadPolicy;
use crate::error::AppError;
use crate::fetcher::{now_ms, PriceFetcher};
use crate::sampler::record_sample;
use crate::spread::{compute_stats, spread, spread_a, spread_b, spread_percent};
use crate::state::{StoreRegistry, TrackedInstrument};
use crate::types::{InstrumentPair, Observation, SpreadDirection, StatSummary};

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<StoreRegistry>,
    pub fetcher: PriceFetcher,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    pub read_policy: ReadPolicy,
    pub max_chart_points: usize,
    pub sample_interval: Duration,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_dashboard))
        .route("/api/instruments", get(get_instruments))
        .route("/api/:symbol/summary", get(get_summary))
        .route("/api/:symbol/history", get(get_history))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsView {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub a_percent: Option<f64>,
    pub b_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsView {
    pub a: Option<StatSummary>,
    pub b: Option<StatSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub symbol: String,
    pub now_ms: u64,
    pub window_secs: u64,
    pub sample_count: usize,
    pub latest: Option<Observation>,
    pub spreads: SpreadsView,
    pub stats: StatsView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp_ms: u64,
    pub primary_price: Option<f64>,
    pub counter_bid: Option<f64>,
    pub counter_ask: Option<f64>,
    pub spread_a: Option<f64>,
    pub spread_b: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub points: Vec<HistoryPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentHealth {
    pub symbol: String,
    pub samples_in_window: usize,
    pub last_sample_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub uptime_secs: u64,
    pub samples_accepted: u64,
    pub samples_rejected: u64,
    pub fetch_failures: u64,
    pub last_sample_at_ms: Option<u64>,
    pub instruments: Vec<InstrumentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyResponse {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// Snapshot of one instrument at `now_ms`: latest prices, instantaneous
/// spreads and window stats for both directions.
pub fn build_summary(instrument: &TrackedInstrument, now_ms: u64) -> SummaryResponse {
    let store = &instrument.store;
    let latest = store.latest();
    let current = latest.unwrap_or_default();

    SummaryResponse {
        symbol: instrument.pair.symbol.clone(),
        now_ms,
        window_secs: store.window().as_secs(),
        sample_count: store.len(),
        latest,
        spreads: SpreadsView {
            a: spread(SpreadDirection::A, &current),
            b: spread(SpreadDirection::B, &current),
            a_percent: spread_percent(SpreadDirection::A, &current),
            b_percent: spread_percent(SpreadDirection::B, &current),
        },
        stats: StatsView {
            a: compute_stats(SpreadDirection::A, store, now_ms),
            b: compute_stats(SpreadDirection::B, store, now_ms),
        },
    }
}

pub fn build_history(instrument: &TrackedInstrument, limit: usize) -> Vec<HistoryPoint> {
    instrument
        .store
        .snapshot(Some(limit))
        .iter()
        .map(|o| HistoryPoint {
            timestamp_ms: o.timestamp_ms,
            primary_price: o.primary_price,
            counter_bid: o.counter_bid,
            counter_ask: o.counter_ask,
            spread_a: spread_a(o),
            spread_b: spread_b(o),
        })
        .collect()
}

/// Under `RefreshBeforeRead`, take one extra sample before answering.
async fn refresh_before_read(state: &ApiState, instrument: &TrackedInstrument) {
    if state.read_policy != ReadPolicy::RefreshBeforeRead {
        return;
    }
    let obs = state.fetcher.fetch_observation(&instrument.pair).await;
    record_sample(&instrument.pair, &instrument.store, &state.health, obs);
    debug!(symbol = %instrument.pair.symbol, "[API] refreshed before read");
}

fn lookup(state: &ApiState, symbol: &str) -> Result<TrackedInstrument, AppError> {
    state
        .registry
        .get(symbol)
        .ok_or_else(|| AppError::UnknownInstrument(symbol.to_string()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_dashboard(State(state): State<ApiState>) -> Html<String> {
    let instruments = state.registry.all();
    join_all(instruments.iter().map(|i| refresh_before_read(&state, i))).await;

    let now = now_ms();
    let panels: Vec<InstrumentPanel> = instruments
        .iter()
        .map(|i| InstrumentPanel {
            summary: build_summary(i, now),
            history: build_history(i, state.max_chart_points),
        })
        .collect();

    Html(render_dashboard(&panels, state.sample_interval))
}

async fn get_instruments(State(state): State<ApiState>) -> Json<Vec<InstrumentPair>> {
    Json(state.registry.all().into_iter().map(|i| i.pair).collect())
}

async fn get_summary(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
) -> Result<Json<SummaryResponse>, AppError> {
    let instrument = lookup(&state, &symbol)?;
    refresh_before_read(&state, &instrument).await;
    Ok(Json(build_summary(&instrument, now_ms())))
}

async fn get_history(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let instrument = lookup(&state, &symbol)?;
    let limit = params.limit.unwrap_or(state.max_chart_points);

    Ok(Json(HistoryResponse {
        symbol: instrument.pair.symbol.clone(),
        points: build_history(&instrument, limit),
    }))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let instruments = state
        .registry
        .all()
        .into_iter()
        .map(|i| InstrumentHealth {
            symbol: i.pair.symbol.clone(),
            samples_in_window: i.store.len(),
            last_sample_ms: i.store.latest().map(|o| o.timestamp_ms),
        })
        .collect();

    let last = state.health.last_sample_at_ms();
    Json(HealthResponse {
        uptime_secs: state.health.uptime_secs(),
        samples_accepted: state.health.samples_accepted(),
        samples_rejected: state.health.samples_rejected(),
        fetch_failures: state.health.fetch_failures(),
        last_sample_at_ms: (last > 0).then_some(last),
        instruments,
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50, p95, p99) = state.latency.percentiles();
    let to_ms = |us: Option<u64>| us.map(|v| v as f64 / 1_000.0);
    Json(LatencyResponse {
        p50_ms: to_ms(p50),
        p95_ms: to_ms(p95),
        p99_ms: to_ms(p99),
        sample_count: state.latency.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
