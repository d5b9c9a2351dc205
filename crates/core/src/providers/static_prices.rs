use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::traits::PriceResolver;
use crate::errors::CoreError;

/// In-memory closing price table.
///
/// Used offline and in tests. Lookups are exact-date only, like the live
/// resolvers: a date missing from the table is `PriceNotAvailable`.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceResolver {
    prices: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl StaticPriceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the close of `symbol` on `date`.
    pub fn insert(&mut self, symbol: &str, date: NaiveDate, close: f64) {
        self.prices
            .entry(symbol.to_uppercase())
            .or_default()
            .insert(date, close);
    }

    /// Builder-style `insert`.
    pub fn with_price(mut self, symbol: &str, date: NaiveDate, close: f64) -> Self {
        self.insert(symbol, date, close);
        self
    }

    /// Same close for every day in `from..=to`.
    pub fn with_flat_price(mut self, symbol: &str, from: NaiveDate, to: NaiveDate, close: f64) -> Self {
        for date in from.iter_days().take_while(|d| *d <= to) {
            self.insert(symbol, date, close);
        }
        self
    }

    /// Parse a table of `SYMBOL,YYYY-MM-DD,close` lines.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_csv(text: &str) -> Result<Self, CoreError> {
        let mut resolver = Self::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let [symbol, date, close] = fields.as_slice() else {
                return Err(CoreError::InvalidArgument(format!(
                    "Line {}: expected SYMBOL,DATE,CLOSE, got '{line}'",
                    idx + 1
                )));
            };

            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                CoreError::InvalidArgument(format!("Line {}: bad date '{date}': {e}", idx + 1))
            })?;
            let close: f64 = close.parse().map_err(|e| {
                CoreError::InvalidArgument(format!("Line {}: bad price '{close}': {e}", idx + 1))
            })?;

            resolver.insert(symbol, date, close);
        }

        Ok(resolver)
    }

    /// Symbols with at least one price.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.prices.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

#[async_trait]
impl PriceResolver for StaticPriceResolver {
    fn name(&self) -> &str {
        "Static prices"
    }

    async fn closing_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, CoreError> {
        self.prices
            .get(&symbol.to_uppercase())
            .and_then(|series| series.get(&date))
            .copied()
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.to_uppercase(),
                date,
            })
    }
}
