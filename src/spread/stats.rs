use std::time::Duration;

use crate::spread::calculator::spread;
use crate::state::SampleStore;
use crate::types::{Observation, SpreadDirection, StatSummary};

/// Window statistics for one direction over the store's current contents.
///
/// Re-filters against `now_ms` rather than trusting the store's lazy eviction,
/// so a caller passing a later `now` than the last insert still gets a
/// correct window.
pub fn compute_stats(
    direction: SpreadDirection,
    store: &SampleStore,
    now_ms: u64,
) -> Option<StatSummary> {
    summarize(direction, &store.snapshot(None), now_ms, store.window())
}

/// Aggregate the defined, finite spreads of `observations` inside
/// `[now_ms - window, ∞)`. `None` means no data, never a zero-count summary.
pub fn summarize(
    direction: SpreadDirection,
    observations: &[Observation],
    now_ms: u64,
    window: Duration,
) -> Option<StatSummary> {
    let window_ms = window.as_millis().min(u128::from(u64::MAX)) as u64;
    let cutoff = now_ms.saturating_sub(window_ms);

    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for value in observations
        .iter()
        .filter(|o| o.timestamp_ms >= cutoff)
        .filter_map(|o| spread(direction, o))
        .filter(|v| v.is_finite())
    {
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }

    if count == 0 {
        return None;
    }

    Some(StatSummary { average: sum / count as f64, max, min, count })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(15 * 60);

    fn obs(ts: u64, primary: Option<f64>, bid: Option<f64>, ask: Option<f64>) -> Observation {
        Observation::new(ts, primary, bid, ask)
    }

    #[test]
    fn two_sample_fixture() {
        let store = SampleStore::new(WINDOW);
        store.insert(obs(0, Some(100.0), Some(98.0), Some(102.0)));
        store.insert(obs(1_000, Some(105.0), Some(103.0), Some(106.0)));

        let a = compute_stats(SpreadDirection::A, &store, 1_000).unwrap();
        assert_eq!(a, StatSummary { average: 2.0, max: 2.0, min: 2.0, count: 2 });

        let b = compute_stats(SpreadDirection::B, &store, 1_000).unwrap();
        assert_eq!(b, StatSummary { average: 1.5, max: 2.0, min: 1.0, count: 2 });
    }

    #[test]
    fn empty_store_is_no_data() {
        let store = SampleStore::new(WINDOW);
        assert!(compute_stats(SpreadDirection::A, &store, 1_000).is_none());
    }

    #[test]
    fn undefined_direction_is_no_data() {
        let store = SampleStore::new(WINDOW);
        // Only the counter quote arrived: neither direction is defined.
        store.insert(obs(0, None, Some(98.0), Some(102.0)));
        assert!(compute_stats(SpreadDirection::A, &store, 0).is_none());
        assert!(compute_stats(SpreadDirection::B, &store, 0).is_none());
    }

    #[test]
    fn count_only_includes_defined_operands() {
        let samples = [
            obs(0, Some(100.0), Some(99.0), None),
            obs(1, Some(100.0), None, Some(103.0)),
            obs(2, Some(100.0), Some(97.0), Some(101.0)),
            obs(3, None, Some(96.0), Some(104.0)),
        ];
        let a = summarize(SpreadDirection::A, &samples, 3, WINDOW).unwrap();
        assert_eq!(a.count, 2);
        assert!((a.average - 2.0).abs() < 1e-9);
        assert_eq!((a.min, a.max), (1.0, 3.0));

        let b = summarize(SpreadDirection::B, &samples, 3, WINDOW).unwrap();
        assert_eq!(b.count, 2);
        assert!((b.average - 2.0).abs() < 1e-9);
    }

    #[test]
    fn stale_samples_are_refiltered_even_if_not_evicted() {
        let store = SampleStore::new(WINDOW);
        store.insert(obs(0, Some(110.0), Some(100.0), None));
        store.insert(obs(600_000, Some(101.0), Some(100.0), None));
        // Nothing has been evicted yet, but a later `now` pushes the first sample out.
        assert_eq!(store.len(), 2);

        let a = compute_stats(SpreadDirection::A, &store, 1_000_000).unwrap();
        assert_eq!(a.count, 1);
        assert_eq!(a.average, 1.0);

        assert!(compute_stats(SpreadDirection::A, &store, 10_000_000).is_none());
    }

    #[test]
    fn non_finite_spreads_are_discarded() {
        let samples = [
            obs(0, Some(f64::INFINITY), Some(1.0), None),
            obs(0, Some(f64::NAN), Some(1.0), None),
            obs(0, Some(5.0), Some(1.0), None),
        ];
        let a = summarize(SpreadDirection::A, &samples, 0, WINDOW).unwrap();
        assert_eq!(a.count, 1);
        assert_eq!(a.average, 4.0);
    }

    #[test]
    fn average_is_arithmetic_mean() {
        let spreads = [0.1, 0.2, 0.7, -1.3, 12.25];
        let samples: Vec<_> = spreads
            .iter()
            .enumerate()
            .map(|(i, s)| obs(i as u64, Some(100.0 + s), Some(100.0), None))
            .collect();
        let a = summarize(SpreadDirection::A, &samples, 10, WINDOW).unwrap();
        let expected: f64 = samples.iter().map(|o| o.primary_price.unwrap() - 100.0).sum::<f64>()
            / samples.len() as f64;
        assert_eq!(a.count, spreads.len());
        assert!((a.average - expected).abs() < 1e-9);
        assert!((a.min - -1.3).abs() < 1e-9);
        assert!((a.max - 12.25).abs() < 1e-9);
    }
}
