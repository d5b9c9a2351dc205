use chrono::NaiveDate;

use super::valuation_service::ValuationService;
use crate::errors::CoreError;
use crate::models::instrument::InstrumentCache;
use crate::models::portfolio::Portfolio;
use crate::models::settings::CostBasisMode;
use crate::models::transaction::{Transaction, TransactionKind};

/// Maintains a portfolio's cost-basis history.
///
/// Two derivations are supported (see `CostBasisMode`):
/// - `MarketValue`: each transaction stores the portfolio value at `today`
///   plus every fee paid so far.
/// - `Invested`: each buy adds quantity × close on the transaction date plus
///   its fee; a sell adds only its fee. Later snapshots move by the same amount.
pub struct CostBasisService {
    valuation: ValuationService,
}

impl CostBasisService {
    pub fn new() -> Self {
        Self {
            valuation: ValuationService::new(),
        }
    }

    /// Cost basis on `date` (closest earlier snapshot, else zero).
    pub fn cost_basis(&self, portfolio: &Portfolio, date: NaiveDate) -> f64 {
        portfolio.cost_basis_history().cost_basis(date)
    }

    /// First snapshot of a portfolio created with holdings: its value on the
    /// creation date. Empty portfolios get no snapshot.
    pub async fn record_creation(
        &self,
        portfolio: &mut Portfolio,
        instruments: &InstrumentCache,
    ) -> Result<(), CoreError> {
        if !portfolio.is_populated() {
            return Ok(());
        }
        let created = portfolio.created();
        let value = self.valuation.value(portfolio, instruments, created).await?;
        portfolio.cost_basis_mut().record(created, value);
        Ok(())
    }

    /// Snapshot for an already-applied transaction.
    pub async fn record_transaction(
        &self,
        portfolio: &mut Portfolio,
        instruments: &InstrumentCache,
        tx: &Transaction,
        mode: CostBasisMode,
        today: NaiveDate,
    ) -> Result<(), CoreError> {
        match mode {
            CostBasisMode::MarketValue => {
                let value = self.valuation.value(portfolio, instruments, today).await?;
                let history = portfolio.cost_basis_mut();
                history.add_fee(tx.fee);
                let snapshot = value + history.fees_paid();
                history.record(tx.date, snapshot);
            }
            CostBasisMode::Invested => {
                let spent = match tx.kind {
                    TransactionKind::Buy => {
                        let price = instruments.get_or_create(&tx.symbol).price_on(tx.date).await?;
                        tx.quantity as f64 * price
                    }
                    TransactionKind::Sell => 0.0,
                };
                let history = portfolio.cost_basis_mut();
                history.add_fee(tx.fee);
                history.add_from(tx.date, spent + tx.fee);
            }
        }

        log::debug!(
            "Cost basis on {} is now {:.2} ({mode})",
            tx.date,
            portfolio.cost_basis_history().cost_basis(tx.date)
        );
        Ok(())
    }
}

impl Default for CostBasisService {
    fn default() -> Self {
        Self::new()
    }
}
