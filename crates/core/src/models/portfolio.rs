use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::cost_basis::CostBasisHistory;
use super::ledger::HoldingsLedger;
use super::settings::TransactionPolicy;
use super::transaction::Transaction;
use crate::errors::CoreError;

/// Stable identifier of a portfolio inside a `PortfolioManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortfolioId(Uuid);

impl PortfolioId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CoreError::InvalidArgument(format!("Invalid portfolio id '{s}': {e}")))
    }
}

impl Default for PortfolioId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PortfolioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The unit of persistence: everything in here is serialized as one blob.
///
/// Contains the creation date, the current quantity per symbol, the dated
/// holdings history, the cost-basis history and the transaction trail.
/// Mutated only by `TransactionService` and `CostBasisService`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    created: NaiveDate,

    /// Current quantity per symbol (the latest ledger state)
    holdings: BTreeMap<String, u64>,

    ledger: HoldingsLedger,

    cost_basis: CostBasisHistory,

    #[serde(default)]
    policy: TransactionPolicy,

    #[serde(default)]
    transactions: Vec<Transaction>,
}

impl Portfolio {
    /// An empty portfolio created on `created`.
    pub fn new(created: NaiveDate, policy: TransactionPolicy) -> Self {
        Self {
            created,
            holdings: BTreeMap::new(),
            ledger: HoldingsLedger::new(),
            cost_basis: CostBasisHistory::new(),
            policy,
            transactions: Vec::new(),
        }
    }

    /// A portfolio seeded with `initial` holdings, all recorded on `created`.
    /// Zero quantities are ignored and keys naming the same symbol are summed.
    /// Cost basis is left empty.
    pub fn with_holdings(
        created: NaiveDate,
        policy: TransactionPolicy,
        initial: &BTreeMap<String, u64>,
    ) -> Self {
        let mut portfolio = Self::new(created, policy);
        for (symbol, qty) in initial {
            if *qty == 0 {
                continue;
            }
            let symbol = symbol.trim().to_uppercase();
            let total = portfolio.holdings.entry(symbol.clone()).or_insert(0);
            *total = total.saturating_add(*qty);
            portfolio.ledger.record(&symbol, created, *total);
        }
        portfolio
    }

    pub fn created(&self) -> NaiveDate {
        self.created
    }

    pub fn policy(&self) -> TransactionPolicy {
        self.policy
    }

    /// Current quantity per symbol, including symbols sold down to zero.
    pub fn holdings(&self) -> &BTreeMap<String, u64> {
        &self.holdings
    }

    pub fn holding(&self, symbol: &str) -> Option<u64> {
        self.holdings.get(&symbol.to_uppercase()).copied()
    }

    pub fn ledger(&self) -> &HoldingsLedger {
        &self.ledger
    }

    pub fn cost_basis_history(&self) -> &CostBasisHistory {
        &self.cost_basis
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// `true` once any symbol has been held.
    pub fn is_populated(&self) -> bool {
        !self.holdings.is_empty()
    }

    /// `SYMBOL -> qty` lines for current non-zero holdings.
    pub fn composition(&self) -> String {
        Self::format_composition(self.holdings.iter().map(|(s, q)| (s.as_str(), *q)))
    }

    /// `SYMBOL -> qty` lines for holdings as of `date`.
    pub fn composition_on(&self, date: NaiveDate) -> String {
        let holdings = self.ledger.holdings_as_of(date);
        Self::format_composition(holdings.iter().map(|(s, q)| (s.as_str(), *q)))
    }

    /// Replace this (empty) portfolio with a restored one.
    ///
    /// Fails with `StateConflict` if anything is already held, so a reload
    /// can never clobber in-memory work.
    pub fn restore(&mut self, restored: Portfolio) -> Result<(), CoreError> {
        if self.is_populated() {
            return Err(CoreError::StateConflict(
                "Portfolio already populated; refusing to overwrite it".into(),
            ));
        }
        *self = restored;
        Ok(())
    }

    // ── Mutation (crate-internal) ───────────────────────────────────

    pub(crate) fn ledger_mut(&mut self) -> &mut HoldingsLedger {
        &mut self.ledger
    }

    pub(crate) fn cost_basis_mut(&mut self) -> &mut CostBasisHistory {
        &mut self.cost_basis
    }

    pub(crate) fn set_holding(&mut self, symbol: &str, quantity: u64) {
        self.holdings.insert(symbol.to_uppercase(), quantity);
    }

    pub(crate) fn push_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    fn format_composition<'a>(holdings: impl Iterator<Item = (&'a str, u64)>) -> String {
        let lines: String = holdings
            .filter(|(_, qty)| *qty > 0)
            .map(|(symbol, qty)| format!("{symbol} -> {qty}\n"))
            .collect();
        if lines.is_empty() {
            "No stocks in the portfolio\n".to_string()
        } else {
            lines
        }
    }
}
