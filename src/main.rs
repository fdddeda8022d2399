mod api;
mod config;
mod error;
mod fetcher;
mod sampler;
mod spread;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, ReadPolicy};
use crate::error::Result;
use crate::fetcher::PriceFetcher;
use crate::sampler::Sampler;
use crate::state::StoreRegistry;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Shared state ---
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());
    let fetcher = PriceFetcher::new(&cfg, Arc::clone(&latency), Arc::clone(&health))?;
    let registry = StoreRegistry::new(&cfg.instruments, cfg.window);

    info!(
        instruments = %registry.symbols().join(","),
        window_secs = cfg.window.as_secs(),
        interval_secs = cfg.sample_interval.as_secs(),
        fetch_timeout_ms = cfg.fetch_timeout.as_millis() as u64,
        "Tracking {} instrument(s): primary={} counter={}",
        registry.len(),
        cfg.primary_api_url,
        cfg.counter_api_url,
    );
    if cfg.read_policy == ReadPolicy::RefreshBeforeRead {
        info!("Read policy: every page/API read triggers one extra sample");
    }

    // --- Samplers (one per instrument) ---
    let samplers: Vec<_> = registry
        .all()
        .into_iter()
        .map(|tracked| {
            Sampler::new(
                tracked.pair,
                fetcher.clone(),
                tracked.store,
                Arc::clone(&health),
                cfg.sample_interval,
            )
            .start()
        })
        .collect();

    // --- HTTP server ---
    let api_state = ApiState {
        registry: Arc::clone(&registry),
        fetcher,
        health: Arc::clone(&health),
        latency,
        read_policy: cfg.read_policy,
        max_chart_points: cfg.max_chart_points,
        sample_interval: cfg.sample_interval,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP dashboard listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down {} sampler(s)", samplers.len());
    for handle in samplers {
        info!(symbol = handle.symbol(), "Stopping sampler");
        handle.stop().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c, serving until killed: {e}");
        std::future::pending::<()>().await;
    }
}
