use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::health::HealthState;
use crate::fetcher::PriceFetcher;
use crate::state::SampleStore;
use crate::types::{InstrumentPair, Observation};

/// Periodic fetch → insert loop for one instrument.
pub struct Sampler {
    pair: InstrumentPair,
    fetcher: PriceFetcher,
    store: Arc<SampleStore>,
    health: Arc<HealthState>,
    interval: Duration,
}

/// Running sampler. `stop` ends the loop after the current tick finishes.
pub struct SamplerHandle {
    symbol: String,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Sampler {
    pub fn new(
        pair: InstrumentPair,
        fetcher: PriceFetcher,
        store: Arc<SampleStore>,
        health: Arc<HealthState>,
        interval: Duration,
    ) -> Self {
        Self { pair, fetcher, store, health, interval }
    }

    pub fn start(self) -> SamplerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let symbol = self.pair.symbol.clone();
        let task = tokio::spawn(async move { self.run(stop_rx).await });
        SamplerHandle { symbol, stop_tx, task }
    }

    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        // A slow tick pushes the schedule back instead of bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            symbol = %self.pair.symbol,
            interval_ms = self.interval.as_millis() as u64,
            "[SAMPLER] started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sample_once().await;
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!(symbol = %self.pair.symbol, "[SAMPLER] stopped");
    }

    /// One tick: fetch both venues and insert. Returns whether the store
    /// accepted the observation.
    pub async fn sample_once(&self) -> bool {
        let obs = self.fetcher.fetch_observation(&self.pair).await;
        record_sample(&self.pair, &self.store, &self.health, obs)
    }
}

/// Insert an observation and keep the health counters in step.
/// Shared by the sampler and the refresh-before-read path.
pub fn record_sample(
    pair: &InstrumentPair,
    store: &SampleStore,
    health: &HealthState,
    obs: Observation,
) -> bool {
    if store.insert(obs) {
        health.record_accepted(obs.timestamp_ms);
        debug!(
            symbol = %pair.symbol,
            primary = ?obs.primary_price,
            bid = ?obs.counter_bid,
            ask = ?obs.counter_ask,
            stored = store.len(),
            "[SAMPLER] observation stored"
        );
        true
    } else {
        health.record_rejected();
        warn!(symbol = %pair.symbol, "[SAMPLER] both venues unavailable, tick skipped");
        false
    }
}

impl SamplerHandle {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(symbol = %self.symbol, "[SAMPLER] task ended abnormally: {e}");
        }
    }
}
