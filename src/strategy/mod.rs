//! Strategy engine: bias gating, entry confirmations, and exit levels.
//!
//! The bias and confirmation signals are pluggable. The shipped
//! implementations are placeholders (bias always confirmed, a fixed
//! confirmation count); the engine only fixes their call contract and the
//! skip-on-false behavior around them.

pub mod levels;
pub mod sizing;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::TradingConfig;
use crate::engine::market_data::MarketDataGateway;
use crate::types::{BarSeries, ScanError, TimeFrame};

/// Higher timeframe used for bias.
pub const BIAS_TIMEFRAME: TimeFrame = TimeFrame::hours(4);
pub const BIAS_LIMIT: u32 = 120;

/// Medium timeframe used for bias.
pub const STRUCTURE_TIMEFRAME: TimeFrame = TimeFrame::hour();
pub const STRUCTURE_LIMIT: u32 = 60;

/// Fine-grained timeframe used for entries.
pub const ENTRY_TIMEFRAME: TimeFrame = TimeFrame::minute();
pub const ENTRY_LIMIT: u32 = 300;

/// Default confirmation threshold.
pub const MIN_CONFIRMATIONS: usize = 4;

// ---------------------------------------------------------------------------
// Pluggable signals
// ---------------------------------------------------------------------------

/// Directional judgment over the higher and medium timeframes.
pub trait BiasPredicate: Send + Sync {
    /// `Ok(true)` when the bias is confirmed. Errors count as not confirmed.
    fn confirms(&self, higher: &BarSeries, medium: &BarSeries) -> Result<bool>;

    fn name(&self) -> &str;
}

/// Counts independent entry signals on fine-grained bars.
///
/// Must be deterministic for a given series.
pub trait ConfirmationStrategy: Send + Sync {
    fn count(&self, series: &BarSeries) -> Result<usize>;

    fn name(&self) -> &str;
}

/// Confirms every symbol that has data on both timeframes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderBias;

impl BiasPredicate for PlaceholderBias {
    fn confirms(&self, _higher: &BarSeries, _medium: &BarSeries) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "placeholder"
    }
}

/// Reports the same count for every series.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmations(pub usize);

impl Default for FixedConfirmations {
    fn default() -> Self {
        Self(MIN_CONFIRMATIONS)
    }
}

impl ConfirmationStrategy for FixedConfirmations {
    fn count(&self, _series: &BarSeries) -> Result<usize> {
        Ok(self.0)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

// ---------------------------------------------------------------------------
// Decision engine
// ---------------------------------------------------------------------------

/// Evaluates bias, confirmations and exit levels for one symbol.
pub struct DecisionEngine {
    market_data: MarketDataGateway,
    bias: Box<dyn BiasPredicate>,
    confirmations: Box<dyn ConfirmationStrategy>,
    min_confirmations: usize,
    stop_cap_ratio: f64,
    take_profit_ratio: f64,
}

impl DecisionEngine {
    /// Engine with the placeholder signals and levels from `trading`.
    pub fn new(market_data: MarketDataGateway, trading: &TradingConfig) -> Self {
        Self {
            market_data,
            bias: Box::new(PlaceholderBias),
            confirmations: Box::new(FixedConfirmations::default()),
            min_confirmations: trading.min_confirmations,
            stop_cap_ratio: trading.stop_cap_ratio,
            take_profit_ratio: trading.take_profit_ratio,
        }
    }

    pub fn with_bias(mut self, bias: Box<dyn BiasPredicate>) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_confirmations(mut self, confirmations: Box<dyn ConfirmationStrategy>) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Fetch 4H/120 and 1H/60 bars and ask the bias predicate.
    ///
    /// Empty data on either timeframe, or a predicate error, yields `false`.
    pub async fn evaluate_bias(&self, symbol: &str) -> bool {
        info!(symbol, predicate = self.bias.name(), "Analyzing bias");

        let higher = self
            .market_data
            .fetch(symbol, BIAS_TIMEFRAME, BIAS_LIMIT)
            .await;
        let medium = self
            .market_data
            .fetch(symbol, STRUCTURE_TIMEFRAME, STRUCTURE_LIMIT)
            .await;

        if higher.is_empty() || medium.is_empty() {
            warn!(
                symbol,
                higher_bars = higher.len(),
                medium_bars = medium.len(),
                "Insufficient 4H or 1H data"
            );
            return false;
        }

        match self.bias.confirms(&higher, &medium) {
            Ok(confirmed) => confirmed,
            Err(e) => {
                warn!(symbol, error = %format!("{e:#}"), "Error analyzing bias");
                false
            }
        }
    }

    pub fn count_confirmations(&self, series: &BarSeries) -> Result<usize, ScanError> {
        self.confirmations
            .count(series)
            .map_err(|e| ScanError::Confirmation {
                symbol: series.symbol.clone(),
                message: format!("{} strategy failed: {e:#}", self.confirmations.name()),
            })
    }

    pub fn has_enough_confirmations(&self, series: &BarSeries) -> Result<bool, ScanError> {
        let count = self.count_confirmations(series)?;
        debug!(
            symbol = %series.symbol,
            count,
            required = self.min_confirmations,
            "Checking confirmations"
        );
        Ok(count >= self.min_confirmations)
    }

    pub fn compute_stop_loss(&self, series: &BarSeries) -> Option<f64> {
        levels::stop_loss_with_cap(series, self.stop_cap_ratio)
    }

    pub fn compute_take_profit(&self, entry: f64) -> f64 {
        levels::take_profit_with_ratio(entry, self.take_profit_ratio)
    }

    pub fn market_data(&self) -> &MarketDataGateway {
        &self.market_data
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
