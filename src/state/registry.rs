use std::sync::Arc;
use std::time::Duration;

use crate::state::sample_store::SampleStore;
use crate::types::InstrumentPair;

/// Tracked instrument plus its sample history.
#[derive(Debug, Clone)]
pub struct TrackedInstrument {
    pub pair: InstrumentPair,
    pub store: Arc<SampleStore>,
}

/// Symbol → store lookup shared by samplers and request handlers.
///
/// The instrument set is fixed at startup, so this is a plain list in
/// configured order. Symbols are stored upper-case; lookups are
/// case-insensitive.
pub struct StoreRegistry {
    instruments: Vec<TrackedInstrument>,
}

impl StoreRegistry {
    pub fn new(pairs: &[InstrumentPair], window: Duration) -> Arc<Self> {
        let mut instruments: Vec<TrackedInstrument> = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let symbol = pair.symbol.to_ascii_uppercase();
            if instruments.iter().any(|i| i.pair.symbol == symbol) {
                continue;
            }
            let pair = InstrumentPair { symbol, ..pair.clone() };
            instruments.push(TrackedInstrument { pair, store: SampleStore::new(window) });
        }
        Arc::new(Self { instruments })
    }

    pub fn get(&self, symbol: &str) -> Option<TrackedInstrument> {
        let symbol = symbol.trim();
        self.instruments
            .iter()
            .find(|i| i.pair.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
    }

    /// All instruments in configured order.
    pub fn all(&self) -> Vec<TrackedInstrument> {
        self.instruments.clone()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.instruments.iter().map(|i| i.pair.symbol.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_and_deduplicated() {
        let pairs = vec![
            InstrumentPair::known("BTC").unwrap(),
            InstrumentPair::known("ETH").unwrap(),
            InstrumentPair::known("btc").unwrap(),
        ];
        let registry = StoreRegistry::new(&pairs, Duration::from_secs(900));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.symbols(), ["BTC", "ETH"]);
        let btc = registry.get("btc").unwrap();
        assert_eq!(btc.pair.counter_symbol, "BTC-USD-PERP");
        assert!(registry.get("SOL").is_none());
    }

    #[test]
    fn stores_are_shared_not_copied() {
        let registry =
            StoreRegistry::new(&[InstrumentPair::known("BTC").unwrap()], Duration::from_secs(900));
        let first = registry.get("BTC").unwrap();
        first.store.insert(crate::types::Observation::new(1, Some(1.0), None, None));
        assert_eq!(registry.get("BTC").unwrap().store.len(), 1);
    }

    #[test]
    fn lowercase_config_symbol_is_normalized() {
        let mut pair = InstrumentPair::known("ETH").unwrap();
        pair.symbol = "eth".to_string();
        let registry = StoreRegistry::new(&[pair], Duration::from_secs(900));

        assert_eq!(registry.symbols(), ["ETH"]);
        let eth = registry.get(" Eth ").unwrap();
        assert_eq!(eth.pair.symbol, "ETH");
        assert_eq!(registry.all()[0].pair.primary_market_id, 0);
    }
}
