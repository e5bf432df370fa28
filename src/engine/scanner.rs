//! Watchlist scan cycle.
//!
//! Walks the watchlist one symbol at a time:
//! bias → entry bars → confirmations → stop/target → order → recap.
//! Each symbol yields a `Result<SymbolOutcome, ScanError>`; errors and
//! panics are contained at the symbol boundary so the rest of the
//! watchlist is always processed.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

use super::executor::Executor;
use super::scheduler::CycleRunner;
use crate::strategy::{DecisionEngine, ENTRY_LIMIT, ENTRY_TIMEFRAME};
use crate::types::{CycleReport, ScanError, SkipReason, Symbol, SymbolOutcome, TradeDecision};

pub struct ScanCycle {
    watchlist: Vec<Symbol>,
    engine: DecisionEngine,
    executor: Executor,
    reason: String,
    cycles: AtomicU64,
}

impl ScanCycle {
    pub fn new(
        watchlist: Vec<Symbol>,
        engine: DecisionEngine,
        executor: Executor,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            watchlist,
            engine,
            executor,
            reason: reason.into(),
            cycles: AtomicU64::new(0),
        }
    }

    /// One full pass over the watchlist, in order.
    pub async fn run(&self) -> CycleReport {
        let cycle_number = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let mut report = CycleReport::new(cycle_number);
        info!(cycle = cycle_number, symbols = self.watchlist.len(), "Bot is running!");

        for symbol in &self.watchlist {
            report.symbols_scanned += 1;

            let outcome = AssertUnwindSafe(self.process_symbol(symbol))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(ScanError::Unexpected {
                        symbol: symbol.clone(),
                        message: panic_message(payload.as_ref()),
                    })
                });

            match outcome {
                Ok(SymbolOutcome::Submitted(trade)) => {
                    report.orders_submitted += 1;
                    if let Some(e) = trade.recap_error {
                        warn!(symbol = %symbol, error = %e, "Order stands without a recap");
                        report.recap_failures += 1;
                    }
                }
                Ok(SymbolOutcome::Skipped(reason)) => {
                    info!(symbol = %symbol, reason = %reason, "Skipping symbol");
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(symbol = %symbol, kind = e.kind(), error = %e, "Error processing symbol");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Drive one symbol through the pipeline.
    pub async fn process_symbol(&self, symbol: &str) -> Result<SymbolOutcome, ScanError> {
        if !self.engine.evaluate_bias(symbol).await {
            return Ok(SymbolOutcome::Skipped(SkipReason::BiasNotConfirmed));
        }

        let series = self
            .engine
            .market_data()
            .fetch(symbol, ENTRY_TIMEFRAME, ENTRY_LIMIT)
            .await;
        if series.is_empty() {
            return Ok(SymbolOutcome::Skipped(SkipReason::NoData));
        }

        if !self.engine.has_enough_confirmations(&series)? {
            return Ok(SymbolOutcome::Skipped(SkipReason::NotEnoughConfirmations));
        }

        let entry = series
            .last_close()
            .filter(|close| close.is_finite() && *close > 0.0)
            .ok_or_else(|| ScanError::Data {
                symbol: symbol.to_string(),
                message: format!("unusable last close {:?}", series.last_close()),
            })?;

        let Some(stop_loss) = self.engine.compute_stop_loss(&series) else {
            return Ok(SymbolOutcome::Skipped(SkipReason::NoStopLoss));
        };
        let take_profit = self.engine.compute_take_profit(entry);

        let decision = TradeDecision {
            symbol: symbol.to_string(),
            entry,
            stop_loss,
            take_profit,
            reason: self.reason.clone(),
        };
        info!(decision = %decision, "Trade decision");

        self.executor
            .execute(decision)
            .await
            .map(SymbolOutcome::Submitted)
    }
}

#[async_trait]
impl CycleRunner for ScanCycle {
    async fn run_cycle(&self) -> CycleReport {
        self.run().await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
