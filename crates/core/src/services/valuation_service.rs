use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::instrument::InstrumentCache;
use crate::models::portfolio::Portfolio;

/// Computes what a portfolio was worth on a given date.
///
/// **Note on precision**: values are `f64` and are never rounded here;
/// formatting to two decimals is left to the caller.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Total value on `date`: Σ quantity-as-of(date) × close(date).
    ///
    /// - Before the creation date the portfolio did not exist: `0.0`.
    /// - Symbols not yet acquired by `date` are skipped without a lookup.
    /// - A missing price aborts the whole valuation; it is never counted as zero.
    pub async fn value(
        &self,
        portfolio: &Portfolio,
        instruments: &InstrumentCache,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        if date < portfolio.created() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for (symbol, qty) in portfolio.ledger().holdings_as_of(date) {
            let instrument = instruments.get_or_create(&symbol);
            let price = instrument.price_on(date).await.inspect_err(|e| {
                log::warn!("Valuation on {date} aborted: {e}");
            })?;
            total += qty as f64 * price;
        }

        Ok(total)
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}
