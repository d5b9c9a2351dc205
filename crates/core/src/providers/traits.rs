use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;

/// Source of daily closing prices for ticker symbols.
///
/// Implementations are slow and rate-limited external services (or an
/// in-memory table in tests). Weekends, holidays and unknown symbols yield
/// `CoreError::PriceNotAvailable`; callers must not assume every calendar
/// date has a price.
#[async_trait]
pub trait PriceResolver: Send + Sync {
    /// Human-readable name of this resolver (for logs/errors).
    fn name(&self) -> &str;

    /// Closing price of `symbol` on `date`.
    async fn closing_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, CoreError>;
}

/// Reject NaN, infinite and negative prices coming back from a resolver.
pub(crate) fn validate_price(provider: &str, symbol: &str, price: f64) -> Result<f64, CoreError> {
    if !price.is_finite() || price < 0.0 {
        return Err(CoreError::Api {
            provider: provider.to_string(),
            message: format!(
                "Invalid price returned for {symbol}: {price} (must be finite and non-negative)"
            ),
        });
    }
    Ok(price)
}
