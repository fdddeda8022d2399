use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// One sampling tick across both venues. `None` is the only "missing" marker;
/// `0.0` is a legitimate price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Last-trade price from the primary venue.
    pub primary_price: Option<f64>,
    /// Best bid from the counter venue.
    pub counter_bid: Option<f64>,
    /// Best ask from the counter venue.
    pub counter_ask: Option<f64>,
}

impl Observation {
    pub fn new(
        timestamp_ms: u64,
        primary_price: Option<f64>,
        counter_bid: Option<f64>,
        counter_ask: Option<f64>,
    ) -> Self {
        Self { timestamp_ms, primary_price, counter_bid, counter_ask }
    }

    /// True when no venue contributed a value this tick.
    pub fn is_empty(&self) -> bool {
        self.primary_price.is_none() && self.counter_bid.is_none() && self.counter_ask.is_none()
    }
}

// ---------------------------------------------------------------------------
// Spread direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpreadDirection {
    /// Long primary / short counter: `primary_price - counter_bid`.
    A,
    /// Long counter / short primary: `counter_ask - primary_price`.
    B,
}

impl SpreadDirection {
    pub const ALL: [SpreadDirection; 2] = [SpreadDirection::A, SpreadDirection::B];

    pub fn label(self) -> &'static str {
        match self {
            SpreadDirection::A => "primary − counter bid",
            SpreadDirection::B => "counter ask − primary",
        }
    }
}

impl std::fmt::Display for SpreadDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SpreadDirection::A => "A",
            SpreadDirection::B => "B",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SpreadDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(SpreadDirection::A),
            "B" | "b" => Ok(SpreadDirection::B),
            other => Err(format!("unknown spread direction: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Window statistics
// ---------------------------------------------------------------------------

/// Aggregate over one spread direction. Only ever built with `count >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Instrument configuration
// ---------------------------------------------------------------------------

/// One instrument tracked on both venues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentPair {
    /// Display symbol, e.g. `BTC`.
    pub symbol: String,
    /// Market index on the primary venue.
    pub primary_market_id: u32,
    /// Market symbol on the counter venue, e.g. `BTC-USD-PERP`.
    pub counter_symbol: String,
}

impl InstrumentPair {
    pub fn new(symbol: &str, primary_market_id: u32, counter_symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            primary_market_id,
            counter_symbol: counter_symbol.to_string(),
        }
    }

    /// Built-in pairs, looked up by case-insensitive symbol.
    pub fn known(symbol: &str) -> Option<Self> {
        match symbol.trim().to_ascii_uppercase().as_str() {
            "BTC" => Some(Self::new("BTC", 1, "BTC-USD-PERP")),
            "ETH" => Some(Self::new("ETH", 0, "ETH-USD-PERP")),
            _ => None,
        }
    }
}
