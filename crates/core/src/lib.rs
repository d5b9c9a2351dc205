pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::{NaiveDate, Utc};
use models::{
    instrument::InstrumentCache,
    portfolio::{Portfolio, PortfolioId},
    settings::{validate_fee, Settings},
    transaction::Transaction,
};
use providers::{registry::ResolverChain, traits::PriceResolver};
use services::{
    cost_basis_service::CostBasisService, performance_service::PerformanceService,
    transaction_service::TransactionService, valuation_service::ValuationService,
};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use storage::manager::StorageManager;

use errors::CoreError;

/// Main entry point for the portfolio ledger core library.
/// Holds every portfolio of a session, the shared instrument cache and the
/// services that operate on them.
#[must_use]
pub struct PortfolioManager {
    /// Creation order is preserved; ids are unique.
    portfolios: Vec<(PortfolioId, Portfolio)>,
    instruments: InstrumentCache,
    settings: Settings,
    transaction_service: TransactionService,
    valuation_service: ValuationService,
    cost_basis_service: CostBasisService,
    performance_service: PerformanceService,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for PortfolioManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioManager")
            .field("portfolios", &self.portfolios.len())
            .field("instruments", &self.instruments.len())
            .field("settings", &self.settings)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PortfolioManager {
    /// Manager backed by the default resolver chain for `settings`.
    pub fn new(settings: Settings) -> Self {
        let chain = ResolverChain::new_with_defaults(&settings.api_keys);
        Self::with_resolver(settings, Arc::new(chain))
    }

    /// Manager backed by a caller-supplied resolver (offline use, tests).
    pub fn with_resolver(settings: Settings, resolver: Arc<dyn PriceResolver>) -> Self {
        Self {
            portfolios: Vec::new(),
            instruments: InstrumentCache::new(resolver),
            settings,
            transaction_service: TransactionService::new(),
            valuation_service: ValuationService::new(),
            cost_basis_service: CostBasisService::new(),
            performance_service: PerformanceService::new(),
            dirty: false,
        }
    }

    // ── Creation ────────────────────────────────────────────────────

    /// Create a portfolio holding `holdings` as of `date`.
    ///
    /// The value on `date` becomes the first cost-basis snapshot, so every
    /// symbol must have a price on that date.
    pub async fn create_portfolio(
        &mut self,
        holdings: &BTreeMap<String, u64>,
        date: NaiveDate,
    ) -> Result<PortfolioId, CoreError> {
        if holdings.keys().any(|s| s.trim().is_empty()) {
            return Err(CoreError::InvalidArgument(
                "Ticker symbol must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        for symbol in holdings.keys() {
            let normalized = symbol.trim().to_uppercase();
            if !seen.insert(normalized.clone()) {
                return Err(CoreError::InvalidArgument(format!(
                    "Ticker symbol {normalized} is listed more than once"
                )));
            }
        }

        let mut portfolio =
            Portfolio::with_holdings(date, self.settings.transaction_policy, holdings);
        self.cost_basis_service
            .record_creation(&mut portfolio, &self.instruments)
            .await?;

        Ok(self.insert(portfolio))
    }

    /// Create a portfolio with nothing in it yet.
    pub fn create_empty_portfolio(&mut self, date: NaiveDate) -> PortfolioId {
        let portfolio = Portfolio::new(date, self.settings.transaction_policy);
        self.insert(portfolio)
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Buy `quantity` shares of `symbol` on `date`, paying the configured
    /// commission. Returns the new quantity held on `date`.
    pub async fn buy(
        &mut self,
        id: PortfolioId,
        symbol: &str,
        quantity: u64,
        date: NaiveDate,
    ) -> Result<u64, CoreError> {
        let tx = Transaction::buy(symbol, quantity, date).with_fee(self.settings.commission_fee);
        self.transact(id, tx).await
    }

    /// Sell `quantity` shares of `symbol` on `date`, paying the configured
    /// commission. Returns the quantity left on `date`.
    pub async fn sell(
        &mut self,
        id: PortfolioId,
        symbol: &str,
        quantity: u64,
        date: NaiveDate,
    ) -> Result<u64, CoreError> {
        let tx = Transaction::sell(symbol, quantity, date).with_fee(self.settings.commission_fee);
        self.transact(id, tx).await
    }

    /// Apply a transaction and its cost-basis snapshot to a copy of the
    /// portfolio, committing only if both succeed.
    async fn transact(&mut self, id: PortfolioId, tx: Transaction) -> Result<u64, CoreError> {
        let mut working = self.get(id)?.clone();

        let new_total = self.transaction_service.apply(&mut working, &tx)?;
        self.cost_basis_service
            .record_transaction(
                &mut working,
                &self.instruments,
                &tx,
                self.settings.cost_basis_mode,
                today(),
            )
            .await?;

        *self.get_mut(id)? = working;
        self.dirty = true;
        log::info!(
            "{} {} {} on {} in portfolio {id}",
            tx.kind,
            tx.quantity,
            tx.symbol,
            tx.date
        );
        Ok(new_total)
    }

    // ── Holdings & Value ────────────────────────────────────────────

    /// `SYMBOL -> qty` lines for the current holdings.
    pub fn composition(&self, id: PortfolioId) -> Result<String, CoreError> {
        Ok(self.get(id)?.composition())
    }

    /// `SYMBOL -> qty` lines for the holdings as of `date`.
    pub fn composition_on(&self, id: PortfolioId, date: NaiveDate) -> Result<String, CoreError> {
        Ok(self.get(id)?.composition_on(date))
    }

    /// Current quantity per symbol.
    pub fn holdings(&self, id: PortfolioId) -> Result<&BTreeMap<String, u64>, CoreError> {
        Ok(self.get(id)?.holdings())
    }

    /// Portfolio value on `date`. Dates after today are rejected.
    pub async fn value(&self, id: PortfolioId, date: NaiveDate) -> Result<f64, CoreError> {
        let today = today();
        if date > today {
            return Err(CoreError::InvalidArgument(format!(
                "Cannot value a portfolio on {date}: it is after today ({today})"
            )));
        }
        let portfolio = self.get(id)?;
        self.valuation_service
            .value(portfolio, &self.instruments, date)
            .await
    }

    /// Cost basis as of `date`.
    pub fn cost_basis(&self, id: PortfolioId, date: NaiveDate) -> Result<f64, CoreError> {
        let portfolio = self.get(id)?;
        Ok(self.cost_basis_service.cost_basis(portfolio, date))
    }

    // ── Performance ─────────────────────────────────────────────────

    /// Text bar chart of the portfolio's value from `start` to `end`.
    pub async fn performance(
        &self,
        id: PortfolioId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String, CoreError> {
        let portfolio = self.get(id)?;
        let chart = self
            .performance_service
            .render(portfolio, &self.instruments, start, end)
            .await?;
        Ok(format!(
            "Performance of portfolio {id} from {start} to {end}\n\n{chart}"
        ))
    }

    // ── Lookup ──────────────────────────────────────────────────────

    /// `(id, creation date)` for every portfolio, in creation order.
    #[must_use]
    pub fn list_portfolios(&self) -> Vec<(PortfolioId, NaiveDate)> {
        self.portfolios
            .iter()
            .map(|(id, p)| (*id, p.created()))
            .collect()
    }

    #[must_use]
    pub fn portfolio_ids(&self) -> Vec<PortfolioId> {
        self.portfolios.iter().map(|(id, _)| *id).collect()
    }

    pub fn portfolio(&self, id: PortfolioId) -> Result<&Portfolio, CoreError> {
        self.get(id)
    }

    /// Accepted transactions of a portfolio, oldest first.
    pub fn transactions(&self, id: PortfolioId) -> Result<&[Transaction], CoreError> {
        Ok(self.get(id)?.transactions())
    }

    #[must_use]
    pub fn portfolio_count(&self) -> usize {
        self.portfolios.len()
    }

    /// Number of distinct instruments resolved so far.
    #[must_use]
    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Serialize one portfolio to PFLG bytes.
    pub fn save_portfolio_bytes(&self, id: PortfolioId) -> Result<Vec<u8>, CoreError> {
        let portfolio = self.get(id)?;
        Self::ensure_saveable(id, portfolio)?;
        StorageManager::save_to_bytes(portfolio)
    }

    /// Restore PFLG bytes into an existing, still empty portfolio.
    pub fn restore_portfolio_bytes(&mut self, id: PortfolioId, data: &[u8]) -> Result<(), CoreError> {
        let target = self.get_mut(id)?;
        StorageManager::restore_into(target, data)?;
        self.dirty = true;
        Ok(())
    }

    /// Write every portfolio to `dir` as `<id>.pflg`.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_dir(&mut self, dir: &Path) -> Result<usize, CoreError> {
        if self.portfolios.is_empty() {
            return Err(CoreError::InvalidArgument("No portfolios to save".into()));
        }
        for (id, portfolio) in &self.portfolios {
            Self::ensure_saveable(*id, portfolio)?;
        }
        let written = StorageManager::save_to_dir(dir, &self.portfolios)?;
        self.dirty = false;
        Ok(written)
    }

    /// Load every portfolio file in `dir` into this (empty) manager.
    /// Returns the loaded ids, oldest portfolio first.
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<Vec<PortfolioId>, CoreError> {
        if !self.portfolios.is_empty() {
            return Err(CoreError::StateConflict(format!(
                "Manager already holds {} portfolio(s); refusing to load over them",
                self.portfolios.len()
            )));
        }
        self.portfolios = StorageManager::load_from_dir(dir)?;
        self.dirty = false;
        Ok(self.portfolio_ids())
    }

    /// Pretty JSON dump of one portfolio.
    pub fn to_json(&self, id: PortfolioId) -> Result<String, CoreError> {
        StorageManager::to_json(self.get(id)?)
    }

    // ── Settings & Dirty State ──────────────────────────────────────

    /// Commission applied to every later buy and sell.
    pub fn set_commission_fee(&mut self, fee: f64) -> Result<(), CoreError> {
        self.settings.commission_fee = validate_fee(fee)?;
        self.dirty = true;
        Ok(())
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether anything changed since the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Internal ────────────────────────────────────────────────────

    fn insert(&mut self, portfolio: Portfolio) -> PortfolioId {
        let id = PortfolioId::new();
        log::info!(
            "Created portfolio {id} on {} with {} holding(s)",
            portfolio.created(),
            portfolio.holdings().len()
        );
        self.portfolios.push((id, portfolio));
        self.dirty = true;
        id
    }

    fn get(&self, id: PortfolioId) -> Result<&Portfolio, CoreError> {
        self.portfolios
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p)
            .ok_or_else(|| CoreError::PortfolioNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: PortfolioId) -> Result<&mut Portfolio, CoreError> {
        self.portfolios
            .iter_mut()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p)
            .ok_or_else(|| CoreError::PortfolioNotFound(id.to_string()))
    }

    fn ensure_saveable(id: PortfolioId, portfolio: &Portfolio) -> Result<(), CoreError> {
        if portfolio.is_populated() {
            Ok(())
        } else {
            Err(CoreError::InvalidArgument(format!(
                "Portfolio {id} is empty; nothing to save"
            )))
        }
    }
}

/// Today's date in UTC.
fn today() -> NaiveDate {
    Utc::now().date_naive()
}
