use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct InstrumentPair {
    pub symbol: String,
    pub primary_market_id: u32,
    pub counter_symbol: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct Observation {
    pub timestamp_ms: u64,
    pub primary_price: Option<f64>,
    pub counter_bid: Option<f64>,
    pub counter_ask: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatSummary {
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SpreadsView {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub a_percent: Option<f64>,
    pub b_percent: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StatsView {
    pub a: Option<StatSummary>,
    pub b: Option<StatSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct SummaryResponse {
    pub symbol: String,
    pub now_ms: u64,
    pub window_secs: u64,
    pub sample_count: usize,
    pub latest: Option<Observation>,
    pub spreads: SpreadsView,
    pub stats: StatsView,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LatencyResponse {
    pub p50_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub summaries: Vec<SummaryResponse>,
    pub latency: LatencyResponse,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            summaries: Vec::new(),
            latency: LatencyResponse::default(),
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let instruments_url = format!("{}/api/instruments", self.base_url);
        let instruments = match client.get(&instruments_url).send().await {
            Ok(resp) => match resp.json::<Vec<InstrumentPair>>().await {
                Ok(list) => list,
                Err(e) => {
                    self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                    return;
                }
            },
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        let requests = instruments.iter().map(|i| {
            let url = format!("{}/api/{}/summary", self.base_url, i.symbol);
            async move { client.get(&url).send().await?.json::<SummaryResponse>().await }
        });
        let latency_url = format!("{}/stats/latency", self.base_url);
        let (results, latency_res) = tokio::join!(
            futures_util::future::join_all(requests),
            client.get(&latency_url).send(),
        );

        let mut summaries = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(s) => summaries.push(s),
                Err(e) => {
                    self.status = ConnectionStatus::Error(format!("{e}"));
                    return;
                }
            }
        }

        self.summaries = summaries;
        self.status = ConnectionStatus::Connected;
        self.last_refresh = std::time::Instant::now();

        if let Ok(l) = latency_res {
            if let Ok(latency) = l.json::<LatencyResponse>().await {
                self.latency = latency;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_price(v: Option<f64>) -> String {
    match v {
        Some(p) if !p.is_nan() => format!("{p:.2}"),
        _ => "—".to_string(),
    }
}

pub fn format_spread(v: Option<f64>) -> String {
    match v {
        Some(s) if !s.is_nan() && s > 0.0 => format!("+{s:.2}"),
        other => format_price(other),
    }
}

pub fn format_percent(v: Option<f64>) -> String {
    match v {
        Some(p) if !p.is_nan() => format!("{}%", format_spread(Some(p))),
        _ => "—".to_string(),
    }
}

pub fn format_latency(ms: Option<f64>) -> String {
    match ms {
        Some(d) if d >= 1000.0 => format!("{:.1}s", d / 1000.0),
        Some(d) => format!("{:.0}ms", d),
        None => "—".to_string(),
    }
}

/// Convert millisecond epoch timestamp to HH:MM:SS string (UTC).
pub fn format_time_ms(ms: u64) -> String {
    let secs = ms / 1_000;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_missing_values_as_dash() {
        assert_eq!(format_price(None), "—");
        assert_eq!(format_spread(Some(f64::NAN)), "—");
        assert_eq!(format_percent(None), "—");
        assert_eq!(format_latency(None), "—");
    }

    #[test]
    fn formats_numbers() {
        assert_eq!(format_price(Some(97123.456)), "97123.46");
        assert_eq!(format_spread(Some(1.5)), "+1.50");
        assert_eq!(format_spread(Some(-0.25)), "-0.25");
        assert_eq!(format_percent(Some(0.0123)), "+0.01%");
        assert_eq!(format_latency(Some(1500.0)), "1.5s");
        assert_eq!(format_latency(Some(42.4)), "42ms");
        assert_eq!(format_time_ms(3_723_000), "01:02:03");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("connection refused", 8), "connect…");
        assert_eq!(truncate("——————", 3), "——…");
    }
}
