use crate::types::{Observation, SpreadDirection};

/// Direction A: `primary_price - counter_bid`.
pub fn spread_a(obs: &Observation) -> Option<f64> {
    Some(obs.primary_price? - obs.counter_bid?)
}

/// Direction B: `counter_ask - primary_price`.
pub fn spread_b(obs: &Observation) -> Option<f64> {
    Some(obs.counter_ask? - obs.primary_price?)
}

/// Direction A as a percentage of the counter bid. `None` when the bid is zero.
pub fn spread_percent_a(obs: &Observation) -> Option<f64> {
    let bid = obs.counter_bid?;
    percent_of(spread_a(obs)?, bid)
}

/// Direction B as a percentage of the primary price. `None` when the price is zero.
pub fn spread_percent_b(obs: &Observation) -> Option<f64> {
    let primary = obs.primary_price?;
    percent_of(spread_b(obs)?, primary)
}

pub fn spread(direction: SpreadDirection, obs: &Observation) -> Option<f64> {
    match direction {
        SpreadDirection::A => spread_a(obs),
        SpreadDirection::B => spread_b(obs),
    }
}

pub fn spread_percent(direction: SpreadDirection, obs: &Observation) -> Option<f64> {
    match direction {
        SpreadDirection::A => spread_percent_a(obs),
        SpreadDirection::B => spread_percent_b(obs),
    }
}

#[inline]
fn percent_of(diff: f64, base: f64) -> Option<f64> {
    if base == 0.0 {
        return None;
    }
    let pct = diff / base * 100.0;
    pct.is_finite().then_some(pct)
}
