pub mod calculator;
pub mod stats;

pub use calculator::{spread, spread_a, spread_b, spread_percent};
pub use stats::compute_stats;
