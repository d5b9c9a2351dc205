use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::errors::CoreError;
use crate::providers::traits::PriceResolver;

/// A tradable ticker symbol with a price-by-date lookup.
///
/// **Equality and hashing** use only the symbol; the resolver behind it is
/// an implementation detail.
pub struct Instrument {
    symbol: String,
    resolver: Arc<dyn PriceResolver>,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, resolver: Arc<dyn PriceResolver>) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            resolver,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Closing price on `date`, straight from the resolver (prices are not cached).
    pub async fn price_on(&self, date: NaiveDate) -> Result<f64, CoreError> {
        log::debug!("Resolving {} on {date} via {}", self.symbol, self.resolver.name());
        self.resolver.closing_price(&self.symbol, date).await
    }
}

impl std::fmt::Debug for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrument")
            .field("symbol", &self.symbol)
            .field("resolver", &self.resolver.name())
            .finish()
    }
}

impl PartialEq for Instrument {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Instrument {}

impl std::hash::Hash for Instrument {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

/// Memoizes exactly one `Instrument` per symbol.
///
/// Owned by whoever builds it (normally `PortfolioManager`) and passed by
/// reference to every service that prices holdings. Entries are never
/// evicted. The lookup-then-insert runs under one lock so two callers can
/// never create competing instruments for the same symbol.
pub struct InstrumentCache {
    resolver: Arc<dyn PriceResolver>,
    instruments: Mutex<HashMap<String, Arc<Instrument>>>,
}

impl InstrumentCache {
    pub fn new(resolver: Arc<dyn PriceResolver>) -> Self {
        Self {
            resolver,
            instruments: Mutex::new(HashMap::new()),
        }
    }

    /// Return the shared instrument for `symbol`, creating it on first use.
    pub fn get_or_create(&self, symbol: &str) -> Arc<Instrument> {
        let key = symbol.trim().to_uppercase();
        let mut instruments = self
            .instruments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        instruments
            .entry(key)
            .or_insert_with_key(|key| {
                log::debug!("Creating instrument {key}");
                Arc::new(Instrument::new(key.clone(), Arc::clone(&self.resolver)))
            })
            .clone()
    }

    /// Whether `symbol` has been requested before.
    pub fn contains(&self, symbol: &str) -> bool {
        self.instruments
            .lock()
            .map(|m| m.contains_key(&symbol.trim().to_uppercase()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.instruments.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The resolver every cached instrument delegates to.
    pub fn resolver(&self) -> &Arc<dyn PriceResolver> {
        &self.resolver
    }
}

impl std::fmt::Debug for InstrumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentCache")
            .field("resolver", &self.resolver.name())
            .field("instruments", &self.len())
            .finish()
    }
}
