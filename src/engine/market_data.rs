//! Market data gateway.
//!
//! Wraps a [`BarSource`] so that callers only ever see a bar series: any
//! remote failure is logged and becomes an empty series. No retries.

use std::sync::Arc;
use tracing::{info, warn};

use crate::broker::BarSource;
use crate::types::{BarSeries, TimeFrame};

#[derive(Clone)]
pub struct MarketDataGateway {
    source: Arc<dyn BarSource>,
}

impl MarketDataGateway {
    pub fn new(source: Arc<dyn BarSource>) -> Self {
        Self { source }
    }

    /// Fetch bars for `symbol`. Empty on any failure.
    pub async fn fetch(&self, symbol: &str, timeframe: TimeFrame, limit: u32) -> BarSeries {
        info!(symbol, timeframe = %timeframe, limit, "Fetching data");

        match self.source.fetch_bars(symbol, timeframe, limit).await {
            Ok(series) if series.symbol == symbol => series,
            Ok(series) => {
                warn!(
                    symbol,
                    returned = %series.symbol,
                    "Bar source returned another symbol, discarding"
                );
                BarSeries::empty(symbol, timeframe)
            }
            Err(e) => {
                warn!(symbol, timeframe = %timeframe, error = %format!("{e:#}"), "Error fetching data");
                BarSeries::empty(symbol, timeframe)
            }
        }
    }
}
