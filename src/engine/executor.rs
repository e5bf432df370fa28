//! Trade executor.
//!
//! Turns a trade decision into a bracket order, submits it through the
//! configured gateway, and writes the recap once the brokerage has
//! accepted. Rejections are reported, never retried, and never recapped.

use std::sync::Arc;
use tracing::{info, warn};

use crate::broker::OrderGateway;
use crate::storage::TradeRecorder;
use crate::strategy::sizing::{order_quantity, to_cents};
use crate::types::{BracketOrder, ExecutedTrade, RecapRecord, ScanError, Side, TradeDecision};

pub struct Executor {
    gateway: Arc<dyn OrderGateway>,
    recorder: TradeRecorder,
    risk_budget: f64,
}

impl Executor {
    pub fn new(gateway: Arc<dyn OrderGateway>, recorder: TradeRecorder, risk_budget: f64) -> Self {
        Self {
            gateway,
            recorder,
            risk_budget,
        }
    }

    /// Build the bracket order for a decision: quantity from the risk
    /// budget, legs rounded to cents.
    pub fn build_order(&self, decision: &TradeDecision) -> Result<BracketOrder, ScanError> {
        let order_error = |message: String| ScanError::Order {
            symbol: decision.symbol.clone(),
            message,
        };

        let qty = order_quantity(self.risk_budget, decision.entry)
            .ok_or_else(|| order_error(format!("cannot size entry price {}", decision.entry)))?;
        let stop_price = to_cents(decision.stop_loss)
            .ok_or_else(|| order_error(format!("invalid stop price {}", decision.stop_loss)))?;
        let limit_price = to_cents(decision.take_profit).ok_or_else(|| {
            order_error(format!("invalid take-profit price {}", decision.take_profit))
        })?;

        Ok(BracketOrder {
            symbol: decision.symbol.clone(),
            qty,
            side: Side::Buy,
            stop_price,
            limit_price,
            client_order_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Submit the decision and, on acceptance, record the recap.
    ///
    /// A recap failure is carried on the returned trade; the order stands.
    /// Dry-run receipts are not recapped.
    pub async fn execute(&self, decision: TradeDecision) -> Result<ExecutedTrade, ScanError> {
        let order = self.build_order(&decision)?;

        let receipt = match self.gateway.submit_bracket(&order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    symbol = %decision.symbol,
                    gateway = self.gateway.name(),
                    error = %format!("{e:#}"),
                    "Failed to execute trade"
                );
                return Err(ScanError::Order {
                    symbol: decision.symbol.clone(),
                    message: format!("{e:#}"),
                });
            }
        };

        let recap_error = if receipt.dry_run {
            None
        } else {
            self.recorder
                .record(&RecapRecord::from(&decision))
                .map(|message| ScanError::Recap {
                    symbol: decision.symbol.clone(),
                    message,
                })
        };

        info!(
            symbol = %decision.symbol,
            order_id = %receipt.order_id,
            qty = order.qty,
            entry = format!("${:.2}", decision.entry),
            stop = %order.stop_price,
            target = %order.limit_price,
            "Executed trade"
        );

        Ok(ExecutedTrade {
            decision,
            receipt,
            recap_error,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
