use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cost basis snapshots keyed by transaction date, plus the running total of
/// commission fees paid.
///
/// Queries use the same closest-prior-date rule as `HoldingsLedger`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBasisHistory {
    entries: BTreeMap<NaiveDate, f64>,
    #[serde(default)]
    fees_paid: f64,
}

impl CostBasisHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot, replacing any entry for that exact date.
    pub fn record(&mut self, date: NaiveDate, amount: f64) {
        self.entries.insert(date, amount);
    }

    /// Cost basis on `date`: the exact snapshot, else the closest earlier
    /// one, else zero.
    pub fn cost_basis(&self, date: NaiveDate) -> f64 {
        self.entries
            .range(..=date)
            .next_back()
            .map(|(_, amount)| *amount)
            .unwrap_or(0.0)
    }

    /// Add `amount` to the basis as of `date` and to every later snapshot,
    /// storing the result at `date`.
    pub fn add_from(&mut self, date: NaiveDate, amount: f64) {
        use std::ops::Bound::{Excluded, Unbounded};

        let base = self.cost_basis(date);
        for (_, later) in self.entries.range_mut((Excluded(date), Unbounded)) {
            *later += amount;
        }
        self.entries.insert(date, base + amount);
    }

    pub fn add_fee(&mut self, fee: f64) {
        self.fees_paid += fee;
    }

    /// Sum of all commission fees charged so far.
    pub fn fees_paid(&self) -> f64 {
        self.fees_paid
    }

    pub fn entries(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
