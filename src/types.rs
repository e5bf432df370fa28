//! Shared types for the scanner.
//!
//! These types form the data model used across all modules. Bar data and
//! trade decisions live for one symbol within one cycle; only the recap
//! record outlives a cycle, and only as a line in the recap log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Symbols and timeframes
// ---------------------------------------------------------------------------

/// A ticker from the configured watchlist.
pub type Symbol = String;

/// Unit of a bar timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrameUnit {
    Minute,
    Hour,
    Day,
}

/// Bar aggregation period, e.g. 4 × Hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeFrame {
    pub amount: u32,
    pub unit: TimeFrameUnit,
}

impl TimeFrame {
    pub const fn new(amount: u32, unit: TimeFrameUnit) -> Self {
        Self { amount, unit }
    }

    pub const fn minute() -> Self {
        Self::new(1, TimeFrameUnit::Minute)
    }

    pub const fn hour() -> Self {
        Self::new(1, TimeFrameUnit::Hour)
    }

    pub const fn hours(amount: u32) -> Self {
        Self::new(amount, TimeFrameUnit::Hour)
    }
}

/// Renders in the brokerage's query form: `1Min`, `4Hour`, `1Day`.
impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            TimeFrameUnit::Minute => "Min",
            TimeFrameUnit::Hour => "Hour",
            TimeFrameUnit::Day => "Day",
        };
        write!(f, "{}{}", self.amount, unit)
    }
}

// ---------------------------------------------------------------------------
// Bars
// ---------------------------------------------------------------------------

/// One OHLC observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Bars for one symbol and timeframe, ordered oldest to newest.
///
/// An empty series means "no usable data", whatever the cause.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub symbol: Symbol,
    pub timeframe: TimeFrame,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<Symbol>, timeframe: TimeFrame, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars,
        }
    }

    pub fn empty(symbol: impl Into<Symbol>, timeframe: TimeFrame) -> Self {
        Self::new(symbol, timeframe, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Close of the most recent bar.
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// The bar `n` positions back from the newest (`n = 1` is the newest).
    pub fn nth_from_end(&self, n: usize) -> Option<&Bar> {
        if n == 0 || n > self.bars.len() {
            return None;
        }
        self.bars.get(self.bars.len() - n)
    }
}

// ---------------------------------------------------------------------------
// Decisions and orders
// ---------------------------------------------------------------------------

/// Entry/stop/target triple computed for one symbol in one cycle.
///
/// `stop_loss < entry < take_profit` is expected but not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDecision {
    pub symbol: Symbol,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub reason: String,
}

impl fmt::Display for TradeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entry=${:.2} SL=${:.2} TP=${:.2} ({})",
            self.symbol, self.entry, self.stop_loss, self.take_profit, self.reason,
        )
    }
}

/// Order side. Only buys are ever submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
        }
    }
}

/// A market-entry bracket order: entry plus stop-loss and take-profit legs,
/// good till canceled. Leg prices are already rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketOrder {
    pub symbol: Symbol,
    pub qty: u64,
    pub side: Side,
    pub stop_price: Decimal,
    pub limit_price: Decimal,
    pub client_order_id: String,
}

impl fmt::Display for BracketOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x{} [SL {:.2} / TP {:.2}]",
            self.side, self.symbol, self.qty, self.stop_price, self.limit_price,
        )
    }
}

/// Brokerage acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub client_order_id: String,
    pub symbol: Symbol,
    pub qty: u64,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    /// Set when the order was only logged, never sent.
    #[serde(default)]
    pub dry_run: bool,
}

impl OrderReceipt {
    /// Synthetic receipt for an order that was only logged.
    pub fn dry_run(order: &BracketOrder) -> Self {
        Self {
            order_id: uuid::Uuid::new_v4().to_string(),
            client_order_id: order.client_order_id.clone(),
            symbol: order.symbol.clone(),
            qty: order.qty,
            status: "dry_run".to_string(),
            submitted_at: Utc::now(),
            dry_run: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Recap
// ---------------------------------------------------------------------------

/// One row of the append-only recap log.
#[derive(Debug, Clone, PartialEq)]
pub struct RecapRecord {
    pub symbol: Symbol,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub reason: String,
}

impl RecapRecord {
    /// `symbol,entry,stopLoss,takeProfit,reason` with a trailing newline.
    /// Prices use the shortest round-trip form and always carry a decimal
    /// point (`100.0`). The reason is written as-is and must not contain a
    /// comma.
    pub fn to_line(&self) -> String {
        format!(
            "{},{:?},{:?},{:?},{}\n",
            self.symbol, self.entry, self.stop_loss, self.take_profit, self.reason,
        )
    }
}

impl From<&TradeDecision> for RecapRecord {
    fn from(d: &TradeDecision) -> Self {
        Self {
            symbol: d.symbol.clone(),
            entry: d.entry,
            stop_loss: d.stop_loss,
            take_profit: d.take_profit,
            reason: d.reason.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-symbol outcomes
// ---------------------------------------------------------------------------

/// Why a symbol was passed over this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BiasNotConfirmed,
    NoData,
    NotEnoughConfirmations,
    NoStopLoss,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BiasNotConfirmed => write!(f, "bias not confirmed"),
            SkipReason::NoData => write!(f, "no data fetched"),
            SkipReason::NotEnoughConfirmations => write!(f, "not enough confirmations"),
            SkipReason::NoStopLoss => write!(f, "could not calculate stop loss"),
        }
    }
}

/// An order that the brokerage accepted.
#[derive(Debug, Clone)]
pub struct ExecutedTrade {
    pub decision: TradeDecision,
    pub receipt: OrderReceipt,
    /// Set when the recap line could not be written. The order stands.
    pub recap_error: Option<ScanError>,
}

/// Successful result of processing one symbol.
#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    Submitted(ExecutedTrade),
    Skipped(SkipReason),
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// Summary of a single pass over the watchlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub started_at: DateTime<Utc>,
    pub symbols_scanned: usize,
    pub orders_submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub recap_failures: usize,
}

impl CycleReport {
    pub fn new(cycle_number: u64) -> Self {
        Self {
            cycle_number,
            started_at: Utc::now(),
            symbols_scanned: 0,
            orders_submitted: 0,
            skipped: 0,
            failed: 0,
            recap_failures: 0,
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle #{}: scanned={} submitted={} skipped={} failed={} recap_failures={}",
            self.cycle_number,
            self.symbols_scanned,
            self.orders_submitted,
            self.skipped,
            self.failed,
            self.recap_failures,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Per-symbol failures, tagged by the stage that produced them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("Data error ({symbol}): {message}")]
    Data { symbol: Symbol, message: String },

    #[error("Confirmation error ({symbol}): {message}")]
    Confirmation { symbol: Symbol, message: String },

    #[error("Order error ({symbol}): {message}")]
    Order { symbol: Symbol, message: String },

    #[error("Recap error ({symbol}): {message}")]
    Recap { symbol: Symbol, message: String },

    #[error("Unexpected failure ({symbol}): {message}")]
    Unexpected { symbol: Symbol, message: String },
}

impl ScanError {
    /// Short tag for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Data { .. } => "data",
            ScanError::Confirmation { .. } => "confirmation",
            ScanError::Order { .. } => "order",
            ScanError::Recap { .. } => "recap",
            ScanError::Unexpected { .. } => "unexpected",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
