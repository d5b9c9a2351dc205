use chrono::NaiveDate;
use thiserror::Error;

/// Unified error type for the entire portfolio-ledger-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Caller mistakes ─────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transaction for {symbol} on {date} violates chronological ordering")]
    ChronologyViolation { symbol: String, date: NaiveDate },

    #[error("Cannot sell {requested} {symbol}: only {held} held")]
    InsufficientHoldings {
        symbol: String,
        requested: u64,
        held: u64,
    },

    #[error("Portfolio not found: {0}")]
    PortfolioNotFound(String),

    // ── Price data ──────────────────────────────────────────────────
    #[error("Price not available for {symbol} on {date}")]
    PriceNotAvailable { symbol: String, date: NaiveDate },

    #[error("API error ({provider}): {message}")]
    Api { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    // ── Persistence ─────────────────────────────────────────────────
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),
}

/// Coarse discriminant callers branch on instead of matching message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    DataUnavailable,
    NotFound,
    StateConflict,
    Storage,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidArgument(_)
            | CoreError::ChronologyViolation { .. }
            | CoreError::InsufficientHoldings { .. }
            | CoreError::PortfolioNotFound(_) => ErrorKind::InvalidArgument,
            CoreError::PriceNotAvailable { .. } | CoreError::Api { .. } | CoreError::Network(_) => {
                ErrorKind::DataUnavailable
            }
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::StateConflict(_) => ErrorKind::StateConflict,
            CoreError::InvalidFileFormat(_)
            | CoreError::UnsupportedVersion(_)
            | CoreError::Serialization(_)
            | CoreError::Deserialization(_)
            | CoreError::FileIO(_) => ErrorKind::Storage,
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            CoreError::NotFound(e.to_string())
        } else {
            CoreError::FileIO(e.to_string())
        }
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL, query string and API key included.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
