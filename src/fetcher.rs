use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::Config;
use crate::error::Result;
use crate::types::{InstrumentPair, Observation};

/// Best-effort client for both venues. Every failure mode (connect error,
/// timeout, non-2xx, bad JSON, missing or non-numeric field) collapses to
/// `None` for the affected field; nothing here returns an error to callers.
#[derive(Clone)]
pub struct PriceFetcher {
    client: reqwest::Client,
    primary_api_url: String,
    counter_api_url: String,
    latency: Arc<LatencyStats>,
    health: Arc<HealthState>,
}

impl PriceFetcher {
    pub fn new(cfg: &Config, latency: Arc<LatencyStats>, health: Arc<HealthState>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            primary_api_url: cfg.primary_api_url.trim_end_matches('/').to_string(),
            counter_api_url: cfg.counter_api_url.trim_end_matches('/').to_string(),
            latency,
            health,
        })
    }

    /// Capture one observation: both venues queried concurrently, stamped when
    /// the slower of the two answers (or times out).
    pub async fn fetch_observation(&self, pair: &InstrumentPair) -> Observation {
        let (primary_price, (counter_bid, counter_ask)) =
            tokio::join!(self.fetch_primary_price(pair), self.fetch_counter_quote(pair));

        Observation::new(now_ms(), primary_price, counter_bid, counter_ask)
    }

    /// Last-trade price from the primary venue's order book details.
    pub async fn fetch_primary_price(&self, pair: &InstrumentPair) -> Option<f64> {
        let url = format!(
            "{}/api/v1/orderBookDetails?market_id={}",
            self.primary_api_url, pair.primary_market_id
        );
        let body = self.get_json(&pair.symbol, "primary", &url).await?;
        let price = parse_last_trade_price(&body, pair.primary_market_id);
        if price.is_none() {
            self.health.inc_fetch_failures();
            warn!(symbol = %pair.symbol, "[FETCH] primary: no usable last_trade_price in response");
        }
        price
    }

    /// Best bid / best ask from the counter venue.
    pub async fn fetch_counter_quote(&self, pair: &InstrumentPair) -> (Option<f64>, Option<f64>) {
        let url = format!("{}/v1/bbo/{}", self.counter_api_url, pair.counter_symbol);
        let Some(body) = self.get_json(&pair.symbol, "counter", &url).await else {
            return (None, None);
        };
        let (bid, ask) = parse_quote(&body);
        if bid.is_none() || ask.is_none() {
            self.health.inc_fetch_failures();
            warn!(
                symbol = %pair.symbol,
                bid = ?bid,
                ask = ?ask,
                "[FETCH] counter: incomplete bid/ask in response"
            );
        }
        (bid, ask)
    }

    async fn get_json(&self, symbol: &str, venue: &str, url: &str) -> Option<serde_json::Value> {
        let started = Instant::now();
        let result = self.request_json(url).await;
        let elapsed = started.elapsed();
        self.latency.record(elapsed);

        match result {
            Ok(body) => {
                debug!(symbol, venue, latency_ms = elapsed.as_millis() as u64, "[FETCH] ok");
                Some(body)
            }
            Err(e) => {
                self.health.inc_fetch_failures();
                warn!(
                    symbol,
                    venue,
                    latency_ms = elapsed.as_millis() as u64,
                    "[FETCH] {venue} request failed: {e}"
                );
                None
            }
        }
    }

    async fn request_json(&self, url: &str) -> Result<serde_json::Value> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// A JSON number or a numeric string, finite only.
pub fn parse_number(v: &serde_json::Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|n| n.is_finite())
}

/// Accepts either `{ "order_book_details": [ { "market_id", "last_trade_price" }, ... ] }`
/// or a ticker object carrying `last_trade_price` at the top level.
///
/// Only the record for `market_id` is used. Records without any `market_id`
/// are treated as already scoped to the request, so the first one is taken.
pub fn parse_last_trade_price(body: &serde_json::Value, market_id: u32) -> Option<f64> {
    if let Some(details) = body.get("order_book_details").and_then(|d| d.as_array()) {
        let record = if details.iter().any(|d| d.get("market_id").is_some()) {
            details.iter().find(|d| {
                d.get("market_id")
                    .and_then(parse_number)
                    .is_some_and(|id| id == f64::from(market_id))
            })
        } else {
            details.first()
        };
        return record
            .and_then(|d| d.get("last_trade_price"))
            .and_then(parse_number);
    }

    body.get("last_trade_price").and_then(parse_number)
}

/// Reads `bid`/`ask`, falling back to `best_bid`/`best_ask`.
pub fn parse_quote(body: &serde_json::Value) -> (Option<f64>, Option<f64>) {
    let field = |primary: &str, fallback: &str| {
        body.get(primary)
            .and_then(parse_number)
            .or_else(|| body.get(fallback).and_then(parse_number))
    };
    (field("bid", "best_bid"), field("ask", "best_ask"))
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn test_config(base_url: &str, timeout_ms: u64) -> Config {
        let vars: HashMap<&str, String> = HashMap::from([
            ("PRIMARY_API_URL", base_url.to_string()),
            ("COUNTER_API_URL", base_url.to_string()),
            ("FETCH_TIMEOUT_MS", timeout_ms.to_string()),
        ]);
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fetcher_for(base_url: &str, timeout_ms: u64) -> (PriceFetcher, Arc<HealthState>, Arc<LatencyStats>) {
        let health = Arc::new(HealthState::new());
        let latency = Arc::new(LatencyStats::new());
        let fetcher =
            PriceFetcher::new(&test_config(base_url, timeout_ms), latency.clone(), health.clone()).unwrap();
        (fetcher, health, latency)
    }

    fn btc() -> InstrumentPair {
        InstrumentPair::known("BTC").unwrap()
    }

    #[test]
    fn number_parsing_accepts_strings() {
        assert_eq!(parse_number(&json!(1.5)), Some(1.5));
        assert_eq!(parse_number(&json!("97250.1")), Some(97250.1));
        assert_eq!(parse_number(&json!("0")), Some(0.0));
        assert_eq!(parse_number(&json!("n/a")), None);
        assert_eq!(parse_number(&json!(null)), None);
        assert_eq!(parse_number(&json!("inf")), None);
    }

    #[test]
    fn last_trade_price_from_nested_details() {
        let body = json!({
            "code": 200,
            "order_book_details": [
                { "market_id": 0, "last_trade_price": 3120.5 },
                { "market_id": 1, "last_trade_price": "97000.25" }
            ]
        });
        assert_eq!(parse_last_trade_price(&body, 1), Some(97000.25));
        assert_eq!(parse_last_trade_price(&body, 0), Some(3120.5));
        assert_eq!(parse_last_trade_price(&body, 7), None);
    }

    #[test]
    fn other_market_price_is_never_used() {
        let eth_only = json!({ "order_book_details": [{ "market_id": 0, "last_trade_price": 3120.5 }] });
        assert_eq!(parse_last_trade_price(&eth_only, 1), None);

        let unscoped = json!({ "order_book_details": [{ "last_trade_price": "97000" }] });
        assert_eq!(parse_last_trade_price(&unscoped, 1), Some(97000.0));
    }

    #[tokio::test]
    async fn mismatched_market_counts_as_failure() {
        let app = Router::new()
            .route(
                "/api/v1/orderBookDetails",
                get(|| async {
                    Json(json!({ "order_book_details": [{ "market_id": 0, "last_trade_price": 3120.5 }] }))
                }),
            )
            .route("/v1/bbo/:symbol", get(|| async { Json(json!({ "bid": "98", "ask": "102" })) }));
        let base = spawn_upstream(app).await;
        let (fetcher, health, _) = fetcher_for(&base, 1_000);

        let obs = fetcher.fetch_observation(&btc()).await;
        assert_eq!(obs.primary_price, None);
        assert_eq!(obs.counter_bid, Some(98.0));
        assert_eq!(health.fetch_failures(), 1);
    }

    #[test]
    fn last_trade_price_from_ticker() {
        assert_eq!(parse_last_trade_price(&json!({ "last_trade_price": 42 }), 1), Some(42.0));
        assert_eq!(parse_last_trade_price(&json!({ "order_book_details": [] }), 1), None);
        assert_eq!(parse_last_trade_price(&json!({ "price": 1 }), 1), None);
    }

    #[test]
    fn quote_field_name_variants() {
        assert_eq!(parse_quote(&json!({ "bid": "98", "ask": "102" })), (Some(98.0), Some(102.0)));
        assert_eq!(
            parse_quote(&json!({ "best_bid": 98.5, "best_ask": 101.5 })),
            (Some(98.5), Some(101.5))
        );
        assert_eq!(parse_quote(&json!({ "bid": "x", "ask": 1 })), (None, Some(1.0)));
    }

    #[tokio::test]
    async fn fetches_both_venues() {
        let app = Router::new()
            .route(
                "/api/v1/orderBookDetails",
                get(|| async {
                    Json(json!({ "order_book_details": [{ "market_id": 1, "last_trade_price": "100.0" }] }))
                }),
            )
            .route(
                "/v1/bbo/:symbol",
                get(|| async { Json(json!({ "market": "BTC-USD-PERP", "bid": "98", "ask": "102" })) }),
            );
        let base = spawn_upstream(app).await;
        let (fetcher, health, latency) = fetcher_for(&base, 2_000);

        let obs = fetcher.fetch_observation(&btc()).await;
        assert_eq!(obs.primary_price, Some(100.0));
        assert_eq!(obs.counter_bid, Some(98.0));
        assert_eq!(obs.counter_ask, Some(102.0));
        assert!(obs.timestamp_ms > 0);
        assert_eq!(health.fetch_failures(), 0);
        assert_eq!(latency.len(), 2);
    }

    #[tokio::test]
    async fn upstream_500_degrades_to_none() {
        let app = Router::new()
            .route("/api/v1/orderBookDetails", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route("/v1/bbo/:symbol", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let base = spawn_upstream(app).await;
        let (fetcher, health, _) = fetcher_for(&base, 1_000);

        let obs = tokio::time::timeout(Duration::from_secs(3), fetcher.fetch_observation(&btc()))
            .await
            .expect("fetch must resolve within its timeout");
        assert!(obs.is_empty());
        assert_eq!(health.fetch_failures(), 2);
    }

    #[tokio::test]
    async fn stalled_upstream_times_out() {
        let app = Router::new().route(
            "/v1/bbo/:symbol",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Json(json!({ "bid": 1, "ask": 2 }))
            }),
        );
        let base = spawn_upstream(app).await;
        let (fetcher, _, _) = fetcher_for(&base, 200);

        let started = Instant::now();
        let quote = fetcher.fetch_counter_quote(&btc()).await;
        assert_eq!(quote, (None, None));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn malformed_json_degrades_to_none() {
        let app = Router::new()
            .route("/api/v1/orderBookDetails", get(|| async { "not json" }))
            .route("/v1/bbo/:symbol", get(|| async { Json(json!({ "bid": 98 })) }));
        let base = spawn_upstream(app).await;
        let (fetcher, health, _) = fetcher_for(&base, 1_000);

        let obs = fetcher.fetch_observation(&btc()).await;
        assert_eq!(obs.primary_price, None);
        assert_eq!(obs.counter_bid, Some(98.0));
        assert_eq!(obs.counter_ask, None);
        assert_eq!(health.fetch_failures(), 2);
    }

    #[tokio::test]
    async fn unreachable_upstream_degrades_to_none() {
        // Bind then drop to get a port nobody is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (fetcher, _, _) = fetcher_for(&format!("http://{addr}"), 500);
        assert!(fetcher.fetch_observation(&btc()).await.is_empty());
    }
}
