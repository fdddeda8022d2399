//! Shared health state for the /health endpoint.
//! Updated by the samplers and the fetcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Shared health metrics. Updated by sampling components, read by API.
pub struct HealthState {
    started_at: Instant,
    /// Observations accepted into a store.
    pub samples_accepted: AtomicU64,
    /// Ticks where every venue field was missing (no-op insert).
    pub samples_rejected: AtomicU64,
    /// Individual upstream requests that degraded to "unavailable".
    pub fetch_failures: AtomicU64,
    /// Millisecond timestamp of the last accepted observation (0 = none).
    pub last_sample_at_ms: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            samples_accepted: AtomicU64::new(0),
            samples_rejected: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            last_sample_at_ms: AtomicU64::new(0),
        }
    }

    pub fn record_accepted(&self, timestamp_ms: u64) {
        self.samples_accepted.fetch_add(1, Ordering::Relaxed);
        self.last_sample_at_ms.fetch_max(timestamp_ms, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn samples_accepted(&self) -> u64 {
        self.samples_accepted.load(Ordering::Relaxed)
    }

    pub fn samples_rejected(&self) -> u64 {
        self.samples_rejected.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn last_sample_at_ms(&self) -> u64 {
        self.last_sample_at_ms.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}
