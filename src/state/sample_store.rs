use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::types::Observation;

// ---------------------------------------------------------------------------
// SampleStore
// ---------------------------------------------------------------------------

/// Time-bounded, append-only history of observations for one instrument.
///
/// Observations are kept in insertion order, and that order is also
/// chronological: `insert` never lets a timestamp go backwards. Expired entries are only swept on `insert`, from the
/// front, so readers may briefly see samples slightly older than the window;
/// the statistics engine re-filters for that reason.
///
/// A single mutex guards the deque. No method awaits while holding it, so
/// `snapshot` and `latest` never see a half-applied append or eviction.
#[derive(Debug)]
pub struct SampleStore {
    window_ms: u64,
    samples: Mutex<VecDeque<Observation>>,
}

impl SampleStore {
    pub fn new(window: Duration) -> Arc<Self> {
        Arc::new(Self::with_window(window))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window_ms: window.as_millis().min(u128::from(u64::MAX)) as u64,
            samples: Mutex::new(VecDeque::new()),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Append an observation, then evict everything older than
    /// `observation.timestamp_ms - window`.
    ///
    /// A timestamp earlier than the current newest sample (two writers racing
    /// on the same store) is raised to that sample's timestamp, so the series
    /// stays monotonic with ties in insertion order.
    ///
    /// Returns `false` (store untouched) when the observation carries no prices.
    pub fn insert(&self, mut observation: Observation) -> bool {
        if observation.is_empty() {
            return false;
        }

        let mut samples = self.lock();
        if let Some(newest) = samples.back() {
            observation.timestamp_ms = observation.timestamp_ms.max(newest.timestamp_ms);
        }
        let cutoff = observation.timestamp_ms.saturating_sub(self.window_ms);
        samples.push_back(observation);
        while samples.front().is_some_and(|front| front.timestamp_ms < cutoff) {
            samples.pop_front();
        }
        true
    }

    /// Most recently appended observation. Does not evict.
    pub fn latest(&self) -> Option<Observation> {
        self.lock().back().copied()
    }

    /// Current observations in chronological order, optionally limited to the
    /// most recent `max_count`.
    pub fn snapshot(&self, max_count: Option<usize>) -> Vec<Observation> {
        let samples = self.lock();
        let skip = match max_count {
            Some(n) => samples.len().saturating_sub(n),
            None => 0,
        };
        samples.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Every mutation is a single push or pop, so a poisoned guard still holds
    /// a consistent deque.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Observation>> {
        self.samples.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
