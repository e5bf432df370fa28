//! Brokerage integrations.
//!
//! Defines the `BarSource` and `OrderGateway` traits and provides:
//! - `AlpacaClient`: REST client implementing both (bars + bracket orders)
//! - `DryRunGateway`: logs bracket orders without sending them

pub mod alpaca;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::types::{BarSeries, BracketOrder, OrderReceipt, TimeFrame};

/// Source of historical OHLC bars.
///
/// Implementors may fail for any remote reason; callers go through
/// [`MarketDataGateway`](crate::engine::market_data::MarketDataGateway),
/// which turns failures into empty series.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BarSource: Send + Sync {
    /// Fetch up to `limit` of the most recent bars, oldest first.
    async fn fetch_bars(&self, symbol: &str, timeframe: TimeFrame, limit: u32)
        -> Result<BarSeries>;
}

/// Order submission endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit a bracket order. An `Err` means the order was not accepted.
    async fn submit_bracket(&self, order: &BracketOrder) -> Result<OrderReceipt>;

    /// Gateway name for logging.
    fn name(&self) -> &'static str;
}

/// Gateway that only logs. Selected with `trading.dry_run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunGateway;

#[async_trait]
impl OrderGateway for DryRunGateway {
    async fn submit_bracket(&self, order: &BracketOrder) -> Result<OrderReceipt> {
        info!(
            symbol = %order.symbol,
            qty = order.qty,
            stop = %order.stop_price,
            target = %order.limit_price,
            "[DRY RUN] Would submit bracket order"
        );
        Ok(OrderReceipt::dry_run(order))
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
