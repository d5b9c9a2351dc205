// ═══════════════════════════════════════════════════════════════════
// Service Tests: TransactionService, ValuationService,
// CostBasisService, PerformanceService
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

use portfolio_ledger_core::errors::{CoreError, ErrorKind};
use portfolio_ledger_core::models::chart::Granularity;
use portfolio_ledger_core::models::instrument::InstrumentCache;
use portfolio_ledger_core::models::portfolio::Portfolio;
use portfolio_ledger_core::models::settings::{CostBasisMode, TransactionPolicy};
use portfolio_ledger_core::models::transaction::Transaction;
use portfolio_ledger_core::providers::static_prices::StaticPriceResolver;
use portfolio_ledger_core::services::cost_basis_service::CostBasisService;
use portfolio_ledger_core::services::performance_service::{
    month_end, year_end, PerformanceService,
};
use portfolio_ledger_core::services::transaction_service::TransactionService;
use portfolio_ledger_core::services::valuation_service::ValuationService;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn portfolio(created: NaiveDate, policy: TransactionPolicy, pairs: &[(&str, u64)]) -> Portfolio {
    let initial: BTreeMap<String, u64> = pairs.iter().map(|(s, q)| (s.to_string(), *q)).collect();
    Portfolio::with_holdings(created, policy, &initial)
}

fn cache(prices: StaticPriceResolver) -> InstrumentCache {
    InstrumentCache::new(Arc::new(prices))
}

// ═══════════════════════════════════════════════════════════════════
// TransactionService: chronological ordering
// ═══════════════════════════════════════════════════════════════════

mod sequence_rules {
    use super::*;

    fn history(dates: &[NaiveDate]) -> BTreeMap<NaiveDate, u64> {
        dates.iter().map(|date| (*date, 1)).collect()
    }

    const CHRONO: TransactionPolicy = TransactionPolicy::Chronological;

    #[test]
    fn before_creation_always_rejected() {
        let created = d(2022, 1, 10);
        assert!(!TransactionService::is_sequence_valid(CHRONO, created, None, d(2022, 1, 9)));
        assert!(!TransactionService::is_sequence_valid(
            TransactionPolicy::Backdated,
            created,
            None,
            d(2022, 1, 9)
        ));
    }

    #[test]
    fn no_history_accepts_any_date_after_creation() {
        let created = d(2022, 1, 1);
        assert!(TransactionService::is_sequence_valid(CHRONO, created, None, d(2022, 1, 1)));
        assert!(TransactionService::is_sequence_valid(CHRONO, created, None, d(2025, 6, 1)));
    }

    #[test]
    fn single_entry_accepts_same_or_later() {
        let created = d(2022, 1, 1);
        let h = history(&[d(2022, 3, 1)]);
        assert!(!TransactionService::is_sequence_valid(CHRONO, created, Some(&h), d(2022, 2, 28)));
        assert!(TransactionService::is_sequence_valid(CHRONO, created, Some(&h), d(2022, 3, 1)));
        assert!(TransactionService::is_sequence_valid(CHRONO, created, Some(&h), d(2022, 3, 2)));
    }

    #[test]
    fn two_entries_reject_inside_history() {
        let created = d(2022, 1, 1);
        let h = history(&[d(2022, 2, 1), d(2022, 4, 1)]);
        let valid = |date| TransactionService::is_sequence_valid(CHRONO, created, Some(&h), date);

        assert!(!valid(d(2022, 1, 31)));
        assert!(valid(d(2022, 2, 1)));
        assert!(!valid(d(2022, 2, 2)));
        assert!(!valid(d(2022, 3, 31)));
        assert!(valid(d(2022, 4, 1)));
        assert!(valid(d(2022, 5, 1)));
    }

    #[test]
    fn backdated_accepts_inside_history() {
        let created = d(2022, 1, 1);
        let h = history(&[d(2022, 2, 1), d(2022, 4, 1)]);
        assert!(TransactionService::is_sequence_valid(
            TransactionPolicy::Backdated,
            created,
            Some(&h),
            d(2022, 3, 1)
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// TransactionService: apply
// ═══════════════════════════════════════════════════════════════════

mod transactions {
    use super::*;

    #[test]
    fn buy_adds_to_current_quantity() {
        init_logger();
        let mut p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 3)]);
        let svc = TransactionService::new();

        let total = svc.apply(&mut p, &Transaction::buy("goog", 1, d(2022, 1, 5))).unwrap();
        assert_eq!(total, 4);
        assert_eq!(p.holding("GOOG"), Some(4));
        assert_eq!(p.ledger().exact("GOOG", d(2022, 1, 5)), Some(4));
        assert_eq!(p.ledger().quantity_as_of("GOOG", d(2022, 1, 4)), 3);
        assert_eq!(p.transactions().len(), 1);
    }

    #[test]
    fn buy_new_symbol() {
        let mut p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 3)]);
        let total = TransactionService::new()
            .apply(&mut p, &Transaction::buy("MSFT", 2, d(2022, 1, 4)))
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(p.composition(), "GOOG -> 3\nMSFT -> 2\n");
    }

    #[test]
    fn overselling_fails_and_exact_sale_empties() {
        let mut p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 3)]);
        let svc = TransactionService::new();

        let err = svc.apply(&mut p, &Transaction::sell("GOOG", 4, d(2022, 1, 4))).unwrap_err();
        match &err {
            CoreError::InsufficientHoldings { symbol, requested, held } => {
                assert_eq!(symbol, "GOOG");
                assert_eq!(*requested, 4);
                assert_eq!(*held, 3);
            }
            other => panic!("Expected InsufficientHoldings, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(p.holding("GOOG"), Some(3));
        assert!(p.transactions().is_empty());

        let left = svc.apply(&mut p, &Transaction::sell("GOOG", 3, d(2022, 1, 4))).unwrap();
        assert_eq!(left, 0);
        assert_eq!(p.holding("GOOG"), Some(0));
        assert_eq!(p.composition(), "No stocks in the portfolio\n");
    }

    #[test]
    fn second_transaction_before_first_is_rejected() {
        let mut p = Portfolio::new(d(2022, 1, 1), TransactionPolicy::Chronological);
        let svc = TransactionService::new();
        svc.apply(&mut p, &Transaction::buy("PUBM", 5, d(2022, 3, 1))).unwrap();

        let err = svc.apply(&mut p, &Transaction::buy("PUBM", 1, d(2022, 2, 28))).unwrap_err();
        assert!(matches!(err, CoreError::ChronologyViolation { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        assert_eq!(svc.apply(&mut p, &Transaction::buy("PUBM", 1, d(2022, 3, 1))).unwrap(), 6);
        assert_eq!(svc.apply(&mut p, &Transaction::buy("PUBM", 1, d(2022, 3, 9))).unwrap(), 7);
    }

    #[test]
    fn before_creation_is_rejected() {
        let mut p = Portfolio::new(d(2022, 1, 10), TransactionPolicy::Chronological);
        let err = TransactionService::new()
            .apply(&mut p, &Transaction::buy("GOOG", 1, d(2022, 1, 9)))
            .unwrap_err();
        assert!(matches!(err, CoreError::ChronologyViolation { .. }));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut p = Portfolio::new(d(2022, 1, 1), TransactionPolicy::Chronological);
        let err = TransactionService::new()
            .apply(&mut p, &Transaction::buy("GOOG", 0, d(2022, 1, 2)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[test]
    fn empty_symbol_is_rejected() {
        let mut p = Portfolio::new(d(2022, 1, 1), TransactionPolicy::Chronological);
        let err = TransactionService::new()
            .apply(&mut p, &Transaction::buy("   ", 1, d(2022, 1, 2)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[test]
    fn earliest_date_uses_quantity_held_then() {
        init_logger();
        let mut p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 3)]);
        let svc = TransactionService::new();
        svc.apply(&mut p, &Transaction::buy("GOOG", 5, d(2022, 1, 5))).unwrap();

        let err = svc.apply(&mut p, &Transaction::sell("GOOG", 6, d(2022, 1, 3))).unwrap_err();
        match err {
            CoreError::InsufficientHoldings { held, .. } => assert_eq!(held, 3),
            other => panic!("Expected InsufficientHoldings, got {other:?}"),
        }
        assert_eq!(p.holding("GOOG"), Some(8));
        assert_eq!(p.ledger().exact("GOOG", d(2022, 1, 3)), Some(3));
        assert_eq!(p.transactions().len(), 1);

        let total = svc.apply(&mut p, &Transaction::sell("GOOG", 2, d(2022, 1, 3))).unwrap();
        assert_eq!(total, 1);
        assert_eq!(p.ledger().exact("GOOG", d(2022, 1, 3)), Some(1));
        assert_eq!(p.ledger().exact("GOOG", d(2022, 1, 5)), Some(6));
        assert_eq!(p.holding("GOOG"), Some(6));
        assert_eq!(p.ledger().quantity_as_of("GOOG", d(2022, 1, 10)), 6);
        assert_eq!(p.composition(), "GOOG -> 6\n");
    }

    #[test]
    fn earliest_date_sell_cannot_drive_later_entries_negative() {
        let mut p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 5)]);
        let svc = TransactionService::new();
        svc.apply(&mut p, &Transaction::sell("GOOG", 4, d(2022, 1, 5))).unwrap();

        let err = svc.apply(&mut p, &Transaction::sell("GOOG", 3, d(2022, 1, 3))).unwrap_err();
        match err {
            CoreError::InsufficientHoldings { held, .. } => assert_eq!(held, 1),
            other => panic!("Expected InsufficientHoldings, got {other:?}"),
        }
        assert_eq!(p.ledger().exact("GOOG", d(2022, 1, 3)), Some(5));
        assert_eq!(p.holding("GOOG"), Some(1));

        assert_eq!(svc.apply(&mut p, &Transaction::buy("GOOG", 2, d(2022, 1, 3))).unwrap(), 7);
        assert_eq!(p.holding("GOOG"), Some(3));
    }

    #[test]
    fn selling_never_held_symbol_is_rejected() {
        let mut p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 3)]);
        let err = TransactionService::new()
            .apply(&mut p, &Transaction::sell("MSFT", 1, d(2022, 1, 4)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert!(p.holding("MSFT").is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
// TransactionService: back-dated policy
// ═══════════════════════════════════════════════════════════════════

mod backdated {
    use super::*;

    #[test]
    fn backdated_buy_shifts_later_entries() {
        let mut p = Portfolio::new(d(2022, 1, 1), TransactionPolicy::Backdated);
        let svc = TransactionService::new();
        svc.apply(&mut p, &Transaction::buy("GOOG", 5, d(2022, 3, 1))).unwrap();

        let at_date = svc.apply(&mut p, &Transaction::buy("GOOG", 2, d(2022, 2, 1))).unwrap();
        assert_eq!(at_date, 2);
        assert_eq!(p.ledger().exact("GOOG", d(2022, 2, 1)), Some(2));
        assert_eq!(p.ledger().exact("GOOG", d(2022, 3, 1)), Some(7));
        assert_eq!(p.holding("GOOG"), Some(7));
    }

    #[test]
    fn backdated_sell_shifts_later_entries() {
        let mut p = Portfolio::new(d(2022, 1, 1), TransactionPolicy::Backdated);
        let svc = TransactionService::new();
        svc.apply(&mut p, &Transaction::buy("GOOG", 2, d(2022, 2, 1))).unwrap();
        svc.apply(&mut p, &Transaction::buy("GOOG", 5, d(2022, 3, 1))).unwrap();

        let left = svc.apply(&mut p, &Transaction::sell("GOOG", 2, d(2022, 2, 15))).unwrap();
        assert_eq!(left, 0);
        assert_eq!(p.ledger().exact("GOOG", d(2022, 3, 1)), Some(5));
        assert_eq!(p.holding("GOOG"), Some(5));
    }

    #[test]
    fn backdated_sell_cannot_drive_later_entry_negative() {
        let mut p = Portfolio::new(d(2022, 1, 1), TransactionPolicy::Backdated);
        let svc = TransactionService::new();
        svc.apply(&mut p, &Transaction::buy("GOOG", 5, d(2022, 2, 1))).unwrap();
        svc.apply(&mut p, &Transaction::sell("GOOG", 4, d(2022, 3, 1))).unwrap();
        let before = p.clone();

        let err = svc.apply(&mut p, &Transaction::sell("GOOG", 3, d(2022, 2, 10))).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientHoldings { held: 1, .. }));
        assert_eq!(p, before);
    }

    #[test]
    fn backdated_sell_before_first_buy_fails() {
        let mut p = Portfolio::new(d(2022, 1, 1), TransactionPolicy::Backdated);
        let svc = TransactionService::new();
        svc.apply(&mut p, &Transaction::buy("GOOG", 5, d(2022, 2, 1))).unwrap();

        let err = svc.apply(&mut p, &Transaction::sell("GOOG", 1, d(2022, 1, 15))).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientHoldings { held: 0, .. }));
    }

    #[test]
    fn backdated_still_respects_creation_date() {
        let mut p = Portfolio::new(d(2022, 1, 10), TransactionPolicy::Backdated);
        let err = TransactionService::new()
            .apply(&mut p, &Transaction::buy("GOOG", 1, d(2022, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, CoreError::ChronologyViolation { .. }));
    }
}

// ═══════════════════════════════════════════════════════════════════
// ValuationService
// ═══════════════════════════════════════════════════════════════════

mod valuation {
    use super::*;

    fn prices() -> StaticPriceResolver {
        StaticPriceResolver::new()
            .with_price("GOOG", d(2022, 1, 3), 100.0)
            .with_price("GOOG", d(2022, 1, 5), 110.0)
            .with_price("MSFT", d(2022, 1, 3), 300.0)
            .with_price("MSFT", d(2022, 1, 5), 310.0)
    }

    #[tokio::test]
    async fn value_before_creation_is_zero() {
        let p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 3)]);
        // Empty price table: no lookup may happen.
        let instruments = cache(StaticPriceResolver::new());
        let value = ValuationService::new().value(&p, &instruments, d(2022, 1, 2)).await.unwrap();
        assert_eq!(value, 0.0);
        assert!(instruments.is_empty());
    }

    #[tokio::test]
    async fn value_sums_quantity_times_close() {
        let p = portfolio(
            d(2022, 1, 3),
            TransactionPolicy::Chronological,
            &[("GOOG", 3), ("MSFT", 1)],
        );
        let instruments = cache(prices());
        let value = ValuationService::new().value(&p, &instruments, d(2022, 1, 3)).await.unwrap();
        assert_eq!(value, 3.0 * 100.0 + 300.0);
        assert_eq!(instruments.len(), 2);
    }

    #[tokio::test]
    async fn value_uses_quantity_as_of_date() {
        let mut p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 3)]);
        TransactionService::new()
            .apply(&mut p, &Transaction::buy("MSFT", 2, d(2022, 1, 5)))
            .unwrap();
        let instruments = cache(prices());
        let svc = ValuationService::new();

        assert_eq!(svc.value(&p, &instruments, d(2022, 1, 3)).await.unwrap(), 300.0);
        assert_eq!(
            svc.value(&p, &instruments, d(2022, 1, 5)).await.unwrap(),
            3.0 * 110.0 + 2.0 * 310.0
        );
    }

    #[tokio::test]
    async fn sold_out_symbol_needs_no_price() {
        let mut p = portfolio(
            d(2022, 1, 3),
            TransactionPolicy::Chronological,
            &[("GOOG", 3), ("PUBM", 2)],
        );
        TransactionService::new()
            .apply(&mut p, &Transaction::sell("PUBM", 2, d(2022, 1, 4)))
            .unwrap();
        let instruments = cache(prices());
        let value = ValuationService::new().value(&p, &instruments, d(2022, 1, 5)).await.unwrap();
        assert_eq!(value, 330.0);
    }

    #[tokio::test]
    async fn missing_price_aborts_valuation() {
        init_logger();
        let p = portfolio(
            d(2022, 1, 3),
            TransactionPolicy::Chronological,
            &[("GOOG", 3), ("MUN", 12)],
        );
        let instruments = cache(prices());
        let err = ValuationService::new()
            .value(&p, &instruments, d(2022, 1, 3))
            .await
            .unwrap_err();
        match err {
            CoreError::PriceNotAvailable { symbol, date } => {
                assert_eq!(symbol, "MUN");
                assert_eq!(date, d(2022, 1, 3));
            }
            other => panic!("Expected PriceNotAvailable, got {other:?}"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// CostBasisService
// ═══════════════════════════════════════════════════════════════════

mod cost_basis {
    use super::*;

    fn today() -> NaiveDate {
        d(2022, 1, 10)
    }

    fn prices() -> StaticPriceResolver {
        StaticPriceResolver::new()
            .with_price("GOOG", d(2022, 1, 3), 100.0)
            .with_price("GOOG", d(2022, 1, 5), 110.0)
            .with_price("GOOG", today(), 120.0)
    }

    async fn created(instruments: &InstrumentCache) -> Portfolio {
        let mut p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 3)]);
        CostBasisService::new().record_creation(&mut p, instruments).await.unwrap();
        p
    }

    async fn transact(
        p: &mut Portfolio,
        instruments: &InstrumentCache,
        tx: Transaction,
        mode: CostBasisMode,
    ) {
        TransactionService::new().apply(p, &tx).unwrap();
        CostBasisService::new()
            .record_transaction(p, instruments, &tx, mode, today())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn creation_snapshot_is_creation_value() {
        let instruments = cache(prices());
        let p = created(&instruments).await;
        let svc = CostBasisService::new();
        assert_eq!(svc.cost_basis(&p, d(2022, 1, 2)), 0.0);
        assert_eq!(svc.cost_basis(&p, d(2022, 1, 3)), 300.0);
        assert_eq!(svc.cost_basis(&p, d(2022, 1, 9)), 300.0);
    }

    #[tokio::test]
    async fn empty_portfolio_gets_no_creation_snapshot() {
        let instruments = cache(StaticPriceResolver::new());
        let mut p = Portfolio::new(d(2022, 1, 3), TransactionPolicy::Chronological);
        CostBasisService::new().record_creation(&mut p, &instruments).await.unwrap();
        assert!(p.cost_basis_history().is_empty());
    }

    #[tokio::test]
    async fn creation_without_price_fails() {
        let instruments = cache(StaticPriceResolver::new());
        let mut p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 3)]);
        let err = CostBasisService::new()
            .record_creation(&mut p, &instruments)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    }

    #[tokio::test]
    async fn market_value_mode_uses_todays_value_plus_fees() {
        let instruments = cache(prices());
        let mut p = created(&instruments).await;

        let tx = Transaction::buy("GOOG", 2, d(2022, 1, 5)).with_fee(5.0);
        transact(&mut p, &instruments, tx, CostBasisMode::MarketValue).await;

        let svc = CostBasisService::new();
        assert_eq!(svc.cost_basis(&p, d(2022, 1, 4)), 300.0);
        assert_eq!(svc.cost_basis(&p, d(2022, 1, 5)), 5.0 * 120.0 + 5.0);
        assert_eq!(p.cost_basis_history().fees_paid(), 5.0);

        let tx = Transaction::sell("GOOG", 1, d(2022, 1, 6)).with_fee(5.0);
        transact(&mut p, &instruments, tx, CostBasisMode::MarketValue).await;
        assert_eq!(svc.cost_basis(&p, d(2022, 1, 6)), 4.0 * 120.0 + 10.0);
    }

    #[tokio::test]
    async fn invested_mode_accumulates_purchases_and_fees() {
        let instruments = cache(prices());
        let mut p = created(&instruments).await;

        let tx = Transaction::buy("GOOG", 2, d(2022, 1, 5)).with_fee(5.0);
        transact(&mut p, &instruments, tx, CostBasisMode::Invested).await;

        let svc = CostBasisService::new();
        assert_eq!(svc.cost_basis(&p, d(2022, 1, 5)), 300.0 + 2.0 * 110.0 + 5.0);

        // No price exists on the sell date: a sale only adds its fee.
        let tx = Transaction::sell("GOOG", 1, d(2022, 1, 7)).with_fee(5.0);
        transact(&mut p, &instruments, tx, CostBasisMode::Invested).await;
        assert_eq!(svc.cost_basis(&p, d(2022, 1, 7)), 530.0);
        assert_eq!(svc.cost_basis(&p, d(2022, 1, 6)), 525.0);
    }

    #[tokio::test]
    async fn market_value_mode_needs_a_close_for_today() {
        let instruments = cache(prices());
        let mut p = created(&instruments).await;
        let tx = Transaction::buy("GOOG", 1, d(2022, 1, 5));
        TransactionService::new().apply(&mut p, &tx).unwrap();
        let saturday = d(2022, 1, 8);

        let err = CostBasisService::new()
            .record_transaction(&mut p, &instruments, &tx, CostBasisMode::MarketValue, saturday)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PriceNotAvailable { .. }));

        CostBasisService::new()
            .record_transaction(&mut p, &instruments, &tx, CostBasisMode::Invested, saturday)
            .await
            .unwrap();
        assert_eq!(CostBasisService::new().cost_basis(&p, d(2022, 1, 5)), 410.0);
    }

    #[tokio::test]
    async fn invested_mode_needs_transaction_date_price() {
        let instruments = cache(prices());
        let mut p = created(&instruments).await;
        let tx = Transaction::buy("GOOG", 1, d(2022, 1, 4));
        TransactionService::new().apply(&mut p, &tx).unwrap();

        let err = CostBasisService::new()
            .record_transaction(&mut p, &instruments, &tx, CostBasisMode::Invested, today())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PriceNotAvailable { .. }));
    }
}

// ═══════════════════════════════════════════════════════════════════
// PerformanceService: sampling
// ═══════════════════════════════════════════════════════════════════

mod sampling {
    use super::*;

    #[test]
    fn start_must_precede_end() {
        let err = PerformanceService::sample_dates(d(2022, 1, 1), d(2022, 1, 1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert!(PerformanceService::sample_dates(d(2022, 2, 1), d(2022, 1, 1)).is_err());
    }

    #[test]
    fn daily_up_to_thirty_days() {
        let (g, dates) = PerformanceService::sample_dates(d(2022, 1, 1), d(2022, 1, 31)).unwrap();
        assert_eq!(g, Granularity::Daily);
        assert_eq!(dates.len(), 31);
        assert_eq!(dates.first(), Some(&d(2022, 1, 1)));
        assert_eq!(dates.last(), Some(&d(2022, 1, 31)));
    }

    #[test]
    fn stepped_thirty_seven_days() {
        let (g, dates) =
            PerformanceService::sample_dates(d(2019, 10, 24), d(2019, 11, 30)).unwrap();
        assert_eq!(g, Granularity::Stepped { days: 7 });
        assert_eq!(
            dates,
            vec![
                d(2019, 10, 31),
                d(2019, 11, 7),
                d(2019, 11, 14),
                d(2019, 11, 21),
                d(2019, 11, 28),
            ]
        );
    }

    #[test]
    fn stepped_last_step_lands_on_end() {
        // 35 days, step 7
        let (_, dates) = PerformanceService::sample_dates(d(2022, 1, 1), d(2022, 2, 5)).unwrap();
        assert_eq!(dates.first(), Some(&d(2022, 1, 8)));
        assert_eq!(dates.last(), Some(&d(2022, 2, 5)));
        assert_eq!(dates.len(), 5);
    }

    #[test]
    fn stepped_always_five_samples_within_range() {
        let start = d(2021, 3, 1);
        for days in 31..=150 {
            let end = start + chrono::Duration::days(days);
            let (_, dates) = PerformanceService::sample_dates(start, end).unwrap();
            assert_eq!(dates.len(), 5, "span {days}");
            assert!(dates.iter().all(|date| *date > start && *date <= end), "span {days}");
        }
    }

    #[test]
    fn monthly_samples_month_ends() {
        let (g, dates) = PerformanceService::sample_dates(d(2022, 1, 15), d(2022, 7, 15)).unwrap();
        assert_eq!(g, Granularity::Monthly);
        assert_eq!(
            dates,
            vec![
                d(2022, 1, 31),
                d(2022, 2, 28),
                d(2022, 3, 31),
                d(2022, 4, 30),
                d(2022, 5, 31),
                d(2022, 6, 30),
                d(2022, 7, 15),
            ]
        );
    }

    #[test]
    fn monthly_clamps_last_month_end() {
        let (_, dates) = PerformanceService::sample_dates(d(2022, 1, 15), d(2022, 7, 20)).unwrap();
        assert_eq!(dates.len(), 7);
        assert_eq!(dates.last(), Some(&d(2022, 7, 20)));
    }

    #[test]
    fn bimonthly_samples_every_other_month_end() {
        let (g, dates) = PerformanceService::sample_dates(d(2020, 1, 1), d(2023, 1, 1)).unwrap();
        assert_eq!(g, Granularity::Bimonthly);
        assert_eq!(&dates[..3], &[d(2020, 1, 31), d(2020, 3, 31), d(2020, 5, 31)]);
        assert_eq!(dates.len(), 19);
        assert_eq!(dates.last(), Some(&d(2023, 1, 1)));
    }

    #[test]
    fn yearly_samples_year_ends() {
        let (g, dates) = PerformanceService::sample_dates(d(2015, 1, 1), d(2021, 6, 30)).unwrap();
        assert_eq!(g, Granularity::Yearly);
        assert_eq!(
            dates,
            vec![
                d(2015, 12, 31),
                d(2016, 12, 31),
                d(2017, 12, 31),
                d(2018, 12, 31),
                d(2019, 12, 31),
                d(2020, 12, 31),
                d(2021, 6, 30),
            ]
        );
    }

    #[test]
    fn granularity_boundaries() {
        let start = d(2020, 1, 1);
        let granularity = |days: i64| {
            PerformanceService::sample_dates(start, start + chrono::Duration::days(days))
                .unwrap()
                .0
        };
        assert_eq!(granularity(1), Granularity::Daily);
        assert_eq!(granularity(30), Granularity::Daily);
        assert_eq!(granularity(31), Granularity::Stepped { days: 6 });
        assert_eq!(granularity(150), Granularity::Stepped { days: 30 });
        assert_eq!(granularity(151), Granularity::Monthly);
        assert_eq!(granularity(912), Granularity::Monthly);
        assert_eq!(granularity(913), Granularity::Bimonthly);
        assert_eq!(granularity(1826), Granularity::Bimonthly);
        assert_eq!(granularity(1827), Granularity::Yearly);
    }

    #[test]
    fn samples_are_strictly_increasing() {
        for days in [1, 29, 44, 150, 400, 1000, 4000] {
            let start = d(2012, 2, 29);
            let (_, dates) =
                PerformanceService::sample_dates(start, start + chrono::Duration::days(days))
                    .unwrap();
            assert!(dates.windows(2).all(|w| w[0] < w[1]), "span {days}");
        }
    }

    #[test]
    fn period_end_helpers() {
        assert_eq!(month_end(d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(month_end(d(2023, 2, 10)), d(2023, 2, 28));
        assert_eq!(month_end(d(2022, 12, 1)), d(2022, 12, 31));
        assert_eq!(year_end(d(2022, 3, 4)), d(2022, 12, 31));
    }
}

// ═══════════════════════════════════════════════════════════════════
// PerformanceService: scale & rendering
// ═══════════════════════════════════════════════════════════════════

mod performance {
    use super::*;

    #[test]
    fn scale_examples() {
        assert_eq!(PerformanceService::scale_for(0.0, 300.0), 7);
        assert_eq!(PerformanceService::scale_for(0.0, 0.0), 1);
        assert_eq!(PerformanceService::scale_for(0.0, 49.0), 1);
        assert_eq!(PerformanceService::scale_for(0.0, 50.0), 2);
        assert_eq!(PerformanceService::scale_for(100.0, 149.99), 1);
    }

    #[test]
    fn scale_keeps_bars_under_fifty() {
        for diff in [1.0, 49.9, 50.0, 99.9, 100.0, 1234.5, 98_765.0] {
            let scale = PerformanceService::scale_for(0.0, diff);
            assert!(diff / (scale as f64) < 50.0, "diff {diff}");
            if scale > 1 {
                assert!(diff / ((scale - 1) as f64) >= 50.0, "diff {diff}");
            }
        }
    }

    #[tokio::test]
    async fn thirty_seven_day_render() {
        init_logger();
        let start = d(2022, 1, 1);
        let end = d(2022, 2, 7);
        let p = portfolio(start, TransactionPolicy::Chronological, &[("GOOG", 1)]);
        let instruments = cache(
            StaticPriceResolver::new()
                .with_flat_price("GOOG", start, end, 100.0)
                .with_price("GOOG", d(2022, 2, 5), 130.0),
        );

        let text = PerformanceService::new().render(&p, &instruments, start, end).await.unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "2022-01-08: ");
        assert_eq!(lines[4], format!("2022-02-05: {}", "*".repeat(30)));
        assert_eq!(lines[5], "Scale: 1");
        assert!(!text.contains("2022-01-01"));
        assert!(!text.contains("2022-02-07"));
    }

    #[tokio::test]
    async fn chart_tracks_min_and_max() {
        let start = d(2022, 1, 1);
        let p = portfolio(d(2022, 1, 3), TransactionPolicy::Chronological, &[("GOOG", 2)]);
        let instruments = cache(
            StaticPriceResolver::new().with_flat_price("GOOG", d(2022, 1, 3), d(2022, 1, 5), 150.0),
        );

        let chart = PerformanceService::new()
            .chart(&p, &instruments, start, d(2022, 1, 5))
            .await
            .unwrap();

        assert_eq!(chart.points.len(), 5);
        assert_eq!(chart.min_value, 0.0);
        assert_eq!(chart.max_value, 300.0);
        assert_eq!(chart.scale, 7);
        assert_eq!(chart.bar_len(300.0), 42);
    }

    #[tokio::test]
    async fn missing_price_aborts_chart() {
        let p = portfolio(d(2022, 1, 1), TransactionPolicy::Chronological, &[("GOOG", 1)]);
        let instruments = cache(StaticPriceResolver::new().with_price("GOOG", d(2022, 1, 1), 1.0));
        let err = PerformanceService::new()
            .render(&p, &instruments, d(2022, 1, 1), d(2022, 1, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PriceNotAvailable { .. }));
    }
}
