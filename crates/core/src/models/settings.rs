use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::CoreError;

/// Environment variable holding an Alpha Vantage API key.
pub const ENV_ALPHAVANTAGE_KEY: &str = "PORTFOLIO_LEDGER_ALPHAVANTAGE_KEY";

/// Environment variable holding the default commission fee.
pub const ENV_COMMISSION_FEE: &str = "PORTFOLIO_LEDGER_COMMISSION_FEE";

/// How a cost-basis snapshot is derived when a transaction is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostBasisMode {
    /// Portfolio value at today's date plus all fees paid so far.
    /// Matches historical reports produced by earlier versions.
    ///
    /// Every buy and sell needs a close for today, so with the live
    /// resolvers transactions fail with `PriceNotAvailable` on weekends and
    /// market holidays. Use `Invested`, or a resolver that can price today,
    /// when that matters.
    #[default]
    MarketValue,
    /// Money actually put in: purchases at the transaction-date price plus fees.
    Invested,
}

impl std::fmt::Display for CostBasisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostBasisMode::MarketValue => write!(f, "MarketValue"),
            CostBasisMode::Invested => write!(f, "Invested"),
        }
    }
}

/// Which transaction dates a portfolio accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPolicy {
    /// No insertion strictly inside an instrument's existing history.
    #[default]
    Chronological,
    /// Any date on or after creation; later entries are shifted to match.
    Backdated,
}

impl std::fmt::Display for TransactionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionPolicy::Chronological => write!(f, "Chronological"),
            TransactionPolicy::Backdated => write!(f, "Backdated"),
        }
    }
}

/// User-configurable settings for a `PortfolioManager`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Commission charged on every buy and sell.
    pub commission_fee: f64,

    pub cost_basis_mode: CostBasisMode,

    /// Policy given to newly created portfolios.
    pub transaction_policy: TransactionPolicy,

    /// Optional API keys for resolvers that require them.
    /// Keys: provider name (e.g., "alphavantage").
    pub api_keys: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            commission_fee: 0.0,
            cost_basis_mode: CostBasisMode::default(),
            transaction_policy: TransactionPolicy::default(),
            api_keys: HashMap::new(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with `PORTFOLIO_LEDGER_*` environment variables.
    pub fn from_env() -> Result<Self, CoreError> {
        let mut settings = Self::default();

        if let Ok(key) = std::env::var(ENV_ALPHAVANTAGE_KEY) {
            if !key.trim().is_empty() {
                settings.api_keys.insert("alphavantage".into(), key.trim().to_string());
            }
        }

        if let Ok(raw) = std::env::var(ENV_COMMISSION_FEE) {
            let fee: f64 = raw.trim().parse().map_err(|e| {
                CoreError::InvalidArgument(format!("{ENV_COMMISSION_FEE}='{raw}' is not a number: {e}"))
            })?;
            settings.commission_fee = validate_fee(fee)?;
        }

        Ok(settings)
    }

    pub fn with_api_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.api_keys.insert(provider.into(), key.into());
        self
    }

    pub fn with_cost_basis_mode(mut self, mode: CostBasisMode) -> Self {
        self.cost_basis_mode = mode;
        self
    }

    pub fn with_transaction_policy(mut self, policy: TransactionPolicy) -> Self {
        self.transaction_policy = policy;
        self
    }

    pub fn with_commission_fee(mut self, fee: f64) -> Result<Self, CoreError> {
        self.commission_fee = validate_fee(fee)?;
        Ok(self)
    }
}

/// Fees must be finite and non-negative.
pub fn validate_fee(fee: f64) -> Result<f64, CoreError> {
    if !fee.is_finite() || fee < 0.0 {
        return Err(CoreError::InvalidArgument(format!(
            "Commission fee must be a finite, non-negative amount (got {fee})"
        )));
    }
    Ok(fee)
}
