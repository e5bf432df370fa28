//! Mock broker for integration testing.
//!
//! Provides deterministic `BarSource` and `OrderGateway` implementations
//! that serve canned bar series, accept or reject orders, and record every
//! call, all in memory with no external dependencies.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use bracketbot::broker::{BarSource, OrderGateway};
use bracketbot::types::*;

/// A mock brokerage. Clones share state.
#[derive(Clone, Default)]
pub struct MockBroker {
    series: Arc<Mutex<HashMap<(String, TimeFrameUnit), Vec<Bar>>>>,
    failing_symbols: Arc<Mutex<HashSet<String>>>,
    rejecting_symbols: Arc<Mutex<HashSet<String>>>,
    fetches: Arc<Mutex<Vec<(String, TimeFrame, u32)>>>,
    orders: Arc<Mutex<Vec<BracketOrder>>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bars` for every request of `symbol` at `unit` granularity.
    pub fn with_bars(self, symbol: &str, unit: TimeFrameUnit, bars: Vec<Bar>) -> Self {
        self.series
            .lock()
            .unwrap()
            .insert((symbol.to_string(), unit), bars);
        self
    }

    /// Flat bars on the 4H and 1H timeframes so bias has data.
    pub fn with_bias_data(self, symbol: &str) -> Self {
        self.with_bars(symbol, TimeFrameUnit::Hour, flat_bars(60, 100.0))
    }

    /// Every bar request for `symbol` fails.
    pub fn failing(self, symbol: &str) -> Self {
        self.failing_symbols
            .lock()
            .unwrap()
            .insert(symbol.to_string());
        self
    }

    /// Every order for `symbol` is rejected.
    pub fn rejecting(self, symbol: &str) -> Self {
        self.rejecting_symbols
            .lock()
            .unwrap()
            .insert(symbol.to_string());
        self
    }

    pub fn fetches(&self) -> Vec<(String, TimeFrame, u32)> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn minute_fetches(&self, symbol: &str) -> usize {
        self.fetches()
            .iter()
            .filter(|(s, tf, _)| s == symbol && tf.unit == TimeFrameUnit::Minute)
            .count()
    }

    pub fn orders(&self) -> Vec<BracketOrder> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl BarSource for MockBroker {
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: u32,
    ) -> Result<BarSeries> {
        self.fetches
            .lock()
            .unwrap()
            .push((symbol.to_string(), timeframe, limit));

        if self.failing_symbols.lock().unwrap().contains(symbol) {
            return Err(anyhow!("mock network failure for {symbol}"));
        }

        let bars = self
            .series
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), timeframe.unit))
            .cloned()
            .unwrap_or_default();
        Ok(BarSeries::new(symbol, timeframe, bars))
    }
}

#[async_trait]
impl OrderGateway for MockBroker {
    async fn submit_bracket(&self, order: &BracketOrder) -> Result<OrderReceipt> {
        if self.rejecting_symbols.lock().unwrap().contains(&order.symbol) {
            return Err(anyhow!("order rejected: insufficient buying power"));
        }
        self.orders.lock().unwrap().push(order.clone());
        Ok(OrderReceipt {
            order_id: Uuid::new_v4().to_string(),
            client_order_id: order.client_order_id.clone(),
            symbol: order.symbol.clone(),
            qty: order.qty,
            status: "accepted".to_string(),
            submitted_at: Utc::now(),
            dry_run: false,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// `n` one-minute bars with constant OHLC.
pub fn flat_bars(n: usize, close: f64) -> Vec<Bar> {
    bars_with_lows(&vec![close; n], close)
}

/// One bar per low, every bar closing at `close`.
pub fn bars_with_lows(lows: &[f64], close: f64) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap();
    lows.iter()
        .enumerate()
        .map(|(i, &low)| Bar {
            timestamp: start + Duration::minutes(i as i64),
            open: close,
            high: close,
            low,
            close,
            volume: 100.0,
        })
        .collect()
}
