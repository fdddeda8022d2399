use std::time::Duration;

use crate::error::{AppError, Result};
use crate::types::InstrumentPair;

pub const PRIMARY_API_URL: &str = "https://mainnet.zklighter.elliot.ai";
pub const COUNTER_API_URL: &str = "https://api.prod.paradex.trade";

/// Length of the statistics window (minutes).
pub const WINDOW_MINUTES: u64 = 15;

/// Sampler cadence (seconds).
pub const SAMPLE_INTERVAL_SECS: u64 = 3;

/// Per-request upstream timeout (milliseconds). Must stay below the sample interval
/// so a stalled venue never holds up the next tick.
pub const FETCH_TIMEOUT_MS: u64 = 2_500;

/// Display-only history cap for the chart.
pub const MAX_CHART_POINTS: usize = 20;

pub const DEFAULT_INSTRUMENTS: &str = "BTC,ETH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Serve whatever the sampler has stored.
    Cached,
    /// Run one extra fetch+insert before answering a read.
    RefreshBeforeRead,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    pub primary_api_url: String,
    pub counter_api_url: String,
    /// Instruments to sample (INSTRUMENTS, comma-separated).
    pub instruments: Vec<InstrumentPair>,
    pub window: Duration,
    pub sample_interval: Duration,
    pub fetch_timeout: Duration,
    pub max_chart_points: usize,
    pub read_policy: ReadPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests don't touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instruments = lookup("INSTRUMENTS")
            .unwrap_or_else(|| DEFAULT_INSTRUMENTS.to_string())
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                InstrumentPair::known(s)
                    .ok_or_else(|| AppError::Config(format!("INSTRUMENTS: unknown instrument {s}")))
            })
            .collect::<Result<Vec<_>>>()?;
        if instruments.is_empty() {
            return Err(AppError::Config("INSTRUMENTS must name at least one instrument".to_string()));
        }

        let window_minutes: u64 = parse_var(&lookup, "WINDOW_MINUTES", WINDOW_MINUTES)?;
        let sample_interval_secs: u64 = parse_var(&lookup, "SAMPLE_INTERVAL_SECS", SAMPLE_INTERVAL_SECS)?;
        let fetch_timeout_ms: u64 = parse_var(&lookup, "FETCH_TIMEOUT_MS", FETCH_TIMEOUT_MS)?;
        if window_minutes == 0 || sample_interval_secs == 0 || fetch_timeout_ms == 0 {
            return Err(AppError::Config(
                "WINDOW_MINUTES, SAMPLE_INTERVAL_SECS and FETCH_TIMEOUT_MS must be positive".to_string(),
            ));
        }

        let window_secs = window_minutes
            .checked_mul(60)
            .ok_or_else(|| AppError::Config(format!("WINDOW_MINUTES is too large: {window_minutes}")))?;

        let read_policy = if parse_var(&lookup, "REFRESH_ON_READ", true)? {
            ReadPolicy::RefreshBeforeRead
        } else {
            ReadPolicy::Cached
        };

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("PORT must be a valid port number".to_string()))?,
            primary_api_url: lookup("PRIMARY_API_URL")
                .unwrap_or_else(|| PRIMARY_API_URL.to_string()),
            counter_api_url: lookup("COUNTER_API_URL")
                .unwrap_or_else(|| COUNTER_API_URL.to_string()),
            instruments,
            window: Duration::from_secs(window_secs),
            sample_interval: Duration::from_secs(sample_interval_secs),
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            max_chart_points: parse_var(&lookup, "MAX_CHART_POINTS", MAX_CHART_POINTS)?,
            read_policy,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_reference_values() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.api_port, 3000);
        assert_eq!(cfg.window, Duration::from_secs(15 * 60));
        assert_eq!(cfg.sample_interval, Duration::from_secs(3));
        assert_eq!(cfg.max_chart_points, 20);
        assert_eq!(cfg.read_policy, ReadPolicy::RefreshBeforeRead);
        let symbols: Vec<_> = cfg.instruments.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, ["BTC", "ETH"]);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config_from(&[
            ("PORT", "8080"),
            ("INSTRUMENTS", "eth"),
            ("WINDOW_MINUTES", "5"),
            ("REFRESH_ON_READ", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.api_port, 8080);
        assert_eq!(cfg.instruments.len(), 1);
        assert_eq!(cfg.instruments[0].symbol, "ETH");
        assert_eq!(cfg.window, Duration::from_secs(300));
        assert_eq!(cfg.read_policy, ReadPolicy::Cached);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(config_from(&[("PORT", "http")]), Err(AppError::Config(_))));
        assert!(matches!(config_from(&[("INSTRUMENTS", "BTC,DOGE")]), Err(AppError::Config(_))));
        assert!(matches!(config_from(&[("SAMPLE_INTERVAL_SECS", "0")]), Err(AppError::Config(_))));
        assert!(matches!(config_from(&[("REFRESH_ON_READ", "maybe")]), Err(AppError::Config(_))));
    }

    #[test]
    fn oversized_window_is_rejected() {
        let huge = u64::MAX.to_string();
        assert!(matches!(config_from(&[("WINDOW_MINUTES", huge.as_str())]), Err(AppError::Config(_))));
    }
}
