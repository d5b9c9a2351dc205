use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::portfolio::Portfolio;
use crate::models::settings::TransactionPolicy;
use crate::models::transaction::{Transaction, TransactionKind};

/// Validates buy/sell transactions and applies them to the holdings ledger.
///
/// No I/O and no price lookups here. Cost basis is updated
/// separately by `CostBasisService` because that needs prices.
pub struct TransactionService;

impl TransactionService {
    pub fn new() -> Self {
        Self
    }

    /// Whether `date` is an acceptable transaction date for a symbol whose
    /// recorded dates are `history`.
    ///
    /// Chronological rule:
    /// - never before `created`
    /// - no history: any date
    /// - one entry `d0`: `date >= d0`
    /// - two or more: `date >= d_min` and not strictly between `d_min` and `d_max`
    pub fn is_sequence_valid(
        policy: TransactionPolicy,
        created: NaiveDate,
        history: Option<&BTreeMap<NaiveDate, u64>>,
        date: NaiveDate,
    ) -> bool {
        if date < created {
            return false;
        }
        if policy == TransactionPolicy::Backdated {
            return true;
        }

        let Some(history) = history else {
            return true;
        };
        let (Some(d_min), Some(d_max)) = (history.keys().next(), history.keys().next_back()) else {
            return true;
        };

        if history.len() == 1 {
            return date >= *d_min;
        }
        date >= *d_min && (date <= *d_min || date >= *d_max)
    }

    /// Validate `tx` against `portfolio` and record the resulting quantity.
    /// Returns the symbol's new quantity at the transaction date.
    ///
    /// Nothing is mutated when validation fails.
    pub fn apply(&self, portfolio: &mut Portfolio, tx: &Transaction) -> Result<u64, CoreError> {
        if tx.quantity == 0 {
            return Err(CoreError::InvalidArgument(
                "Transaction quantity must be positive".into(),
            ));
        }
        if tx.symbol.is_empty() {
            return Err(CoreError::InvalidArgument("Ticker symbol must not be empty".into()));
        }

        if !Self::is_sequence_valid(
            portfolio.policy(),
            portfolio.created(),
            portfolio.ledger().history(&tx.symbol),
            tx.date,
        ) {
            log::warn!(
                "Rejected {} of {} {} on {}: out of chronological order",
                tx.kind,
                tx.quantity,
                tx.symbol,
                tx.date
            );
            return Err(CoreError::ChronologyViolation {
                symbol: tx.symbol.clone(),
                date: tx.date,
            });
        }

        // Chronological order still admits the earliest recorded date, which
        // has later entries to carry the delta.
        let has_later = !portfolio.ledger().entries_after(&tx.symbol, tx.date).is_empty();
        let new_total = match (portfolio.policy(), has_later) {
            (TransactionPolicy::Chronological, false) => self.apply_in_order(portfolio, tx)?,
            _ => self.apply_shifted(portfolio, tx)?,
        };

        portfolio.push_transaction(tx.clone());
        log::debug!("{} {} {} on {} -> {}", tx.kind, tx.quantity, tx.symbol, tx.date, new_total);
        Ok(new_total)
    }

    /// New total = current quantity ± delta, stored at the transaction date.
    /// Only valid when no ledger entry follows `tx.date`.
    fn apply_in_order(&self, portfolio: &mut Portfolio, tx: &Transaction) -> Result<u64, CoreError> {
        let current = portfolio.holding(&tx.symbol);

        let new_total = match tx.kind {
            TransactionKind::Buy => current.unwrap_or(0).checked_add(tx.quantity).ok_or_else(|| {
                CoreError::InvalidArgument(format!("Quantity overflow buying {}", tx.symbol))
            })?,
            TransactionKind::Sell => {
                let held = current.ok_or_else(|| {
                    CoreError::InvalidArgument(format!(
                        "Cannot sell {}: the portfolio has never held it",
                        tx.symbol
                    ))
                })?;
                held.checked_sub(tx.quantity)
                    .ok_or_else(|| Self::insufficient(tx, held))?
            }
        };

        portfolio.ledger_mut().record(&tx.symbol, tx.date, new_total);
        portfolio.set_holding(&tx.symbol, new_total);
        Ok(new_total)
    }

    /// Insert at any date: the quantity as of that date moves by the delta,
    /// and so does every later entry. A sell must keep every entry non-negative.
    fn apply_shifted(&self, portfolio: &mut Portfolio, tx: &Transaction) -> Result<u64, CoreError> {
        let ledger = portfolio.ledger();
        if tx.kind == TransactionKind::Sell && ledger.history(&tx.symbol).is_none() {
            return Err(CoreError::InvalidArgument(format!(
                "Cannot sell {}: the portfolio has never held it",
                tx.symbol
            )));
        }

        let at_date = ledger.quantity_as_of(&tx.symbol, tx.date);
        let later = ledger.entries_after(&tx.symbol, tx.date);

        let shift = |qty: u64| -> Result<u64, CoreError> {
            match tx.kind {
                TransactionKind::Buy => qty.checked_add(tx.quantity).ok_or_else(|| {
                    CoreError::InvalidArgument(format!("Quantity overflow buying {}", tx.symbol))
                }),
                TransactionKind::Sell => qty
                    .checked_sub(tx.quantity)
                    .ok_or_else(|| Self::insufficient(tx, qty)),
            }
        };

        let new_total = shift(at_date)?;
        let shifted: Vec<(NaiveDate, u64)> = later
            .into_iter()
            .map(|(date, qty)| shift(qty).map(|q| (date, q)))
            .collect::<Result<_, _>>()?;

        let ledger = portfolio.ledger_mut();
        ledger.record(&tx.symbol, tx.date, new_total);
        for (date, qty) in &shifted {
            ledger.record(&tx.symbol, *date, *qty);
        }

        let latest = shifted.last().map(|(_, q)| *q).unwrap_or(new_total);
        portfolio.set_holding(&tx.symbol, latest);
        Ok(new_total)
    }

    fn insufficient(tx: &Transaction, held: u64) -> CoreError {
        log::warn!("Rejected sell of {} {}: only {held} held", tx.quantity, tx.symbol);
        CoreError::InsufficientHoldings {
            symbol: tx.symbol.clone(),
            requested: tx.quantity,
            held,
        }
    }
}

impl Default for TransactionService {
    fn default() -> Self {
        Self::new()
    }
}
