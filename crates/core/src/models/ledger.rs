use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-symbol history of quantity-after-transaction, keyed by effective date.
///
/// Only transaction dates are recorded. "As of" queries resolve to the
/// latest entry at or before the query date; later entries never leak
/// backwards into a past valuation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingsLedger {
    entries: BTreeMap<String, BTreeMap<NaiveDate, u64>>,
}

impl HoldingsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `quantity` as the holding of `symbol` after a transaction on
    /// `date`, replacing any entry for that exact date. Does not validate.
    pub fn record(&mut self, symbol: &str, date: NaiveDate, quantity: u64) {
        self.entries
            .entry(symbol.to_uppercase())
            .or_default()
            .insert(date, quantity);
    }

    /// Quantity held on `date`: the exact entry, else the closest earlier
    /// one, else zero.
    pub fn quantity_as_of(&self, symbol: &str, date: NaiveDate) -> u64 {
        self.entries
            .get(&symbol.to_uppercase())
            .and_then(|history| history.range(..=date).next_back())
            .map(|(_, qty)| *qty)
            .unwrap_or(0)
    }

    /// Quantity recorded on exactly `date`, if any.
    pub fn exact(&self, symbol: &str, date: NaiveDate) -> Option<u64> {
        self.entries
            .get(&symbol.to_uppercase())
            .and_then(|history| history.get(&date).copied())
    }

    /// Full date → quantity history of a symbol.
    pub fn history(&self, symbol: &str) -> Option<&BTreeMap<NaiveDate, u64>> {
        self.entries.get(&symbol.to_uppercase())
    }

    /// Earliest and latest recorded dates of a symbol.
    pub fn date_bounds(&self, symbol: &str) -> Option<(NaiveDate, NaiveDate)> {
        let history = self.history(symbol)?;
        let first = history.keys().next()?;
        let last = history.keys().next_back()?;
        Some((*first, *last))
    }

    /// Latest recorded quantity of a symbol.
    pub fn latest(&self, symbol: &str) -> Option<u64> {
        self.history(symbol)
            .and_then(|history| history.values().next_back().copied())
    }

    /// Every symbol ever recorded, sorted.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Non-zero holdings as of `date`.
    pub fn holdings_as_of(&self, date: NaiveDate) -> BTreeMap<String, u64> {
        self.entries
            .keys()
            .filter_map(|symbol| {
                let qty = self.quantity_as_of(symbol, date);
                (qty > 0).then(|| (symbol.clone(), qty))
            })
            .collect()
    }

    /// Entries of `symbol` dated strictly after `date`.
    pub fn entries_after(&self, symbol: &str, date: NaiveDate) -> Vec<(NaiveDate, u64)> {
        use std::ops::Bound::{Excluded, Unbounded};

        self.history(symbol)
            .map(|history| {
                history
                    .range((Excluded(date), Unbounded))
                    .map(|(d, q)| (*d, *q))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of symbols with a history.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total number of dated entries across all symbols.
    pub fn total_entries(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }
}

