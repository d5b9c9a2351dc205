use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of a portfolio transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Acquiring shares
    Buy,
    /// Disposing of shares
    Sell,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Buy => write!(f, "Buy"),
            TransactionKind::Sell => write!(f, "Sell"),
        }
    }
}

/// A single accepted buy/sell, kept as the portfolio's audit trail.
///
/// **Important**: transactions do NOT store price. Prices come from the
/// resolver on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TransactionKind,

    /// Ticker symbol, uppercased
    pub symbol: String,

    /// Whole shares, always positive
    pub quantity: u64,

    /// Effective date (daily granularity)
    pub date: NaiveDate,

    /// Commission charged for this transaction
    pub fee: f64,
}

impl Transaction {
    pub fn new(kind: TransactionKind, symbol: impl Into<String>, quantity: u64, date: NaiveDate) -> Self {
        Self {
            kind,
            symbol: symbol.into().trim().to_uppercase(),
            quantity,
            date,
            fee: 0.0,
        }
    }

    pub fn buy(symbol: impl Into<String>, quantity: u64, date: NaiveDate) -> Self {
        Self::new(TransactionKind::Buy, symbol, quantity, date)
    }

    pub fn sell(symbol: impl Into<String>, quantity: u64, date: NaiveDate) -> Self {
        Self::new(TransactionKind::Sell, symbol, quantity, date)
    }

    /// Attach a commission fee.
    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = fee;
        self
    }
}
