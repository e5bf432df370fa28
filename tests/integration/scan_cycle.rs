//! Scan cycle scenarios against the in-memory broker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bracketbot::broker::{DryRunGateway, OrderGateway};
use bracketbot::config::TradingConfig;
use bracketbot::engine::executor::Executor;
use bracketbot::engine::market_data::MarketDataGateway;
use bracketbot::engine::scanner::ScanCycle;
use bracketbot::storage::TradeRecorder;
use bracketbot::strategy::{BiasPredicate, DecisionEngine, ENTRY_LIMIT};
use bracketbot::types::{BarSeries, SkipReason, SymbolOutcome, TimeFrameUnit};
use rust_decimal_macros::dec;

use crate::mock_broker::{bars_with_lows, flat_bars, MockBroker};

fn temp_recap() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("bracketbot_it_{}.csv", uuid::Uuid::new_v4()));
    p
}

fn scan_with(
    broker: &MockBroker,
    gateway: Arc<dyn OrderGateway>,
    watchlist: &[&str],
    recap: &Path,
) -> ScanCycle {
    let trading = TradingConfig::default();
    let engine = DecisionEngine::new(MarketDataGateway::new(Arc::new(broker.clone())), &trading);
    let executor = Executor::new(gateway, TradeRecorder::new(recap), trading.risk_budget);
    ScanCycle::new(
        watchlist.iter().map(|s| s.to_string()).collect(),
        engine,
        executor,
        trading.reason,
    )
}

fn recap_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Sixty minute bars closing at 100; the last three lows are 90, 85, 95.
fn tsla_minutes() -> Vec<bracketbot::types::Bar> {
    let mut lows = vec![100.0; 57];
    lows.extend([90.0, 85.0, 95.0]);
    bars_with_lows(&lows, 100.0)
}

#[tokio::test]
async fn test_tsla_full_pipeline() {
    let recap = temp_recap();
    let broker = MockBroker::new()
        .with_bias_data("TSLA")
        .with_bars("TSLA", TimeFrameUnit::Minute, tsla_minutes());
    let scan = scan_with(&broker, Arc::new(broker.clone()), &["TSLA"], &recap);

    let report = scan.run().await;
    assert_eq!(report.symbols_scanned, 1);
    assert_eq!(report.orders_submitted, 1);
    assert_eq!(report.failed, 0);

    let orders = broker.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].symbol, "TSLA");
    assert_eq!(orders[0].qty, 1);
    assert_eq!(orders[0].stop_price, dec!(78.00));
    assert_eq!(orders[0].limit_price, dec!(105.00));

    let lines = recap_lines(&recap);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0], "TSLA,100.0,78.0,105.0,4 confirmations met");

    // 4H, 1H, then 1Min with the entry limit
    let fetches = broker.fetches();
    assert_eq!(fetches.len(), 3);
    assert_eq!(fetches[2].1.unit, TimeFrameUnit::Minute);
    assert_eq!(fetches[2].2, ENTRY_LIMIT);

    std::fs::remove_file(&recap).unwrap();
}

#[tokio::test]
async fn test_stop_uses_third_from_last_low_when_below_cap() {
    let recap = temp_recap();
    let broker = MockBroker::new()
        .with_bias_data("NVDA")
        .with_bars(
            "NVDA",
            TimeFrameUnit::Minute,
            bars_with_lows(&[70.0, 99.0, 99.0], 100.0),
        );
    let scan = scan_with(&broker, Arc::new(broker.clone()), &["NVDA"], &recap);

    let outcome = scan.process_symbol("NVDA").await.unwrap();
    let SymbolOutcome::Submitted(trade) = outcome else {
        panic!("expected a submitted trade, got {outcome:?}");
    };
    assert_eq!(trade.decision.stop_loss, 70.0);
    assert_eq!(broker.orders()[0].stop_price, dec!(70.00));

    std::fs::remove_file(&recap).unwrap();
}

#[tokio::test]
async fn test_fetch_failure_skips_symbol() {
    let recap = temp_recap();
    let broker = MockBroker::new().failing("SOXL");
    let scan = scan_with(&broker, Arc::new(broker.clone()), &["SOXL"], &recap);

    let report = scan.run().await;
    assert_eq!(report.skipped, 1);
    assert_eq!(report.orders_submitted, 0);
    assert_eq!(broker.minute_fetches("SOXL"), 0);
    assert!(broker.orders().is_empty());
    assert!(!recap.exists());
}

#[tokio::test]
async fn test_failed_symbol_does_not_stop_the_next() {
    let recap = temp_recap();
    let broker = MockBroker::new()
        .with_bias_data("SPY")
        .with_bars("SPY", TimeFrameUnit::Minute, flat_bars(5, 50.0))
        .rejecting("SPY")
        .with_bias_data("PLTR")
        .with_bars("PLTR", TimeFrameUnit::Minute, flat_bars(5, 20.0));
    let scan = scan_with(&broker, Arc::new(broker.clone()), &["SPY", "PLTR"], &recap);

    let report = scan.run().await;
    assert_eq!(report.symbols_scanned, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.orders_submitted, 1);

    let orders = broker.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].symbol, "PLTR");
    assert_eq!(orders[0].qty, 2);

    // The rejected order leaves no trace in the recap.
    let lines = recap_lines(&recap);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("PLTR,"));

    std::fs::remove_file(&recap).unwrap();
}

#[tokio::test]
async fn test_short_entry_series_is_skipped() {
    let recap = temp_recap();
    let broker = MockBroker::new()
        .with_bias_data("SHOP")
        .with_bars("SHOP", TimeFrameUnit::Minute, flat_bars(2, 60.0));
    let scan = scan_with(&broker, Arc::new(broker.clone()), &["SHOP"], &recap);

    let outcome = scan.process_symbol("SHOP").await.unwrap();
    assert!(matches!(outcome, SymbolOutcome::Skipped(SkipReason::NoStopLoss)));
    assert!(broker.orders().is_empty());
}

struct NeverBias;

impl BiasPredicate for NeverBias {
    fn confirms(&self, _: &BarSeries, _: &BarSeries) -> anyhow::Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "never"
    }
}

#[tokio::test]
async fn test_rejected_bias_never_fetches_entry_bars() {
    let recap = temp_recap();
    let broker = MockBroker::new()
        .with_bias_data("TQQQ")
        .with_bars("TQQQ", TimeFrameUnit::Minute, flat_bars(5, 40.0));

    let trading = TradingConfig::default();
    let engine = DecisionEngine::new(MarketDataGateway::new(Arc::new(broker.clone())), &trading)
        .with_bias(Box::new(NeverBias));
    let executor = Executor::new(
        Arc::new(broker.clone()),
        TradeRecorder::new(&recap),
        trading.risk_budget,
    );
    let scan = ScanCycle::new(vec!["TQQQ".into()], engine, executor, trading.reason);

    let report = scan.run().await;
    assert_eq!(report.skipped, 1);
    assert_eq!(broker.minute_fetches("TQQQ"), 0);
    assert!(broker.orders().is_empty());
    assert!(!recap.exists());
}

#[tokio::test]
async fn test_dry_run_submits_nothing_and_writes_no_recap() {
    let recap = temp_recap();
    let broker = MockBroker::new()
        .with_bias_data("TSLA")
        .with_bars("TSLA", TimeFrameUnit::Minute, tsla_minutes());
    let scan = scan_with(&broker, Arc::new(DryRunGateway), &["TSLA"], &recap);

    let report = scan.run().await;
    assert_eq!(report.orders_submitted, 1);
    assert!(broker.orders().is_empty());
    assert!(!recap.exists());
}
