//! Alpaca REST integration.
//!
//! Historical bars come from the market-data API, orders go to the trading
//! API. Both authenticate with the key pair in default headers.
//!
//! Bars: `GET {data_url}/v2/stocks/bars?symbols=..&timeframe=..&limit=..`
//! Orders: `POST {base_url}/v2/orders`

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{BarSource, OrderGateway};
use crate::config::BrokerCredentials;
use crate::types::{
    Bar, BarSeries, BracketOrder, OrderReceipt, Side, TimeFrame, TimeFrameUnit,
};

const GATEWAY_NAME: &str = "alpaca";

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    #[serde(rename = "t")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v", default)]
    volume: f64,
}

/// Multi-symbol bars response. `bars` is null when nothing matched.
#[derive(Debug, Deserialize)]
struct AlpacaBarsResponse {
    #[serde(default)]
    bars: Option<HashMap<String, Vec<AlpacaBar>>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct TakeProfitLeg {
    limit_price: String,
}

#[derive(Debug, Serialize)]
struct StopLossLeg {
    stop_price: String,
}

#[derive(Debug, Serialize)]
struct AlpacaOrderRequest<'a> {
    symbol: &'a str,
    qty: String,
    side: Side,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    order_class: &'static str,
    take_profit: TakeProfitLeg,
    stop_loss: StopLossLeg,
    client_order_id: &'a str,
}

impl<'a> From<&'a BracketOrder> for AlpacaOrderRequest<'a> {
    fn from(order: &'a BracketOrder) -> Self {
        Self {
            symbol: &order.symbol,
            qty: order.qty.to_string(),
            side: order.side,
            order_type: "market",
            time_in_force: "gtc",
            order_class: "bracket",
            take_profit: TakeProfitLeg {
                limit_price: format!("{:.2}", order.limit_price),
            },
            stop_loss: StopLossLeg {
                stop_price: format!("{:.2}", order.stop_price),
            },
            client_order_id: &order.client_order_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlpacaOrderResponse {
    id: String,
    #[serde(default)]
    client_order_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AlpacaClient {
    http: Client,
    trading_url: String,
    data_url: String,
    feed: String,
}

impl AlpacaClient {
    /// Build a client. `data_url` and `feed` select the market-data host and
    /// feed; the trading host comes from the credentials.
    pub fn new(
        credentials: &BrokerCredentials,
        data_url: &str,
        feed: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            header::HeaderValue::from_str(credentials.api_key.expose_secret())
                .context("API key is not a valid header value")?,
        );
        let mut secret = header::HeaderValue::from_str(credentials.api_secret.expose_secret())
            .context("API secret is not a valid header value")?;
        secret.set_sensitive(true);
        headers.insert("APCA-API-SECRET-KEY", secret);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent("bracketbot/0.1.0")
            .build()
            .context("Failed to build HTTP client for Alpaca")?;

        Ok(Self {
            http,
            trading_url: credentials.base_url.trim_end_matches('/').to_string(),
            data_url: data_url.trim_end_matches('/').to_string(),
            feed: feed.to_string(),
        })
    }

    /// How far back to ask for bars so that `limit` of them exist even
    /// across nights, weekends and holidays.
    fn lookback(timeframe: TimeFrame, limit: u32) -> ChronoDuration {
        let unit = match timeframe.unit {
            TimeFrameUnit::Minute => ChronoDuration::minutes(1),
            TimeFrameUnit::Hour => ChronoDuration::hours(1),
            TimeFrameUnit::Day => ChronoDuration::days(1),
        };
        let span = unit * (timeframe.amount as i32) * (limit as i32);
        span * 4 + ChronoDuration::days(7)
    }

    fn to_bar(b: AlpacaBar) -> Bar {
        Bar {
            timestamp: b.timestamp,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        }
    }
}

#[async_trait]
impl BarSource for AlpacaClient {
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: u32,
    ) -> Result<BarSeries> {
        let url = format!("{}/v2/stocks/bars", self.data_url);
        let start = (Utc::now() - Self::lookback(timeframe, limit)).to_rfc3339();
        let query = [
            ("symbols", symbol.to_string()),
            ("timeframe", timeframe.to_string()),
            ("limit", limit.to_string()),
            ("start", start),
            ("sort", "desc".to_string()),
            ("feed", self.feed.clone()),
        ];

        debug!(symbol, timeframe = %timeframe, limit, "Fetching Alpaca bars");

        let resp = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .context("Alpaca bars request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Alpaca bars error {status}: {body}");
        }

        let parsed: AlpacaBarsResponse = resp
            .json()
            .await
            .context("Failed to parse Alpaca bars response")?;

        if parsed.next_page_token.is_some() {
            debug!(symbol, "Alpaca returned more pages; keeping the first");
        }

        // The response is keyed by symbol; anything else is dropped.
        let mut rows = parsed
            .bars
            .and_then(|mut by_symbol| by_symbol.remove(symbol))
            .unwrap_or_default();

        // Requested newest-first so the limit keeps the latest bars.
        rows.sort_by_key(|b| b.timestamp);
        let bars = rows.into_iter().map(Self::to_bar).collect();

        Ok(BarSeries::new(symbol, timeframe, bars))
    }
}

#[async_trait]
impl OrderGateway for AlpacaClient {
    async fn submit_bracket(&self, order: &BracketOrder) -> Result<OrderReceipt> {
        let url = format!("{}/v2/orders", self.trading_url);
        let body = AlpacaOrderRequest::from(order);

        debug!(symbol = %order.symbol, qty = order.qty, "Submitting Alpaca bracket order");

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Alpaca order request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Alpaca order rejected {status}: {body}");
        }

        let parsed: AlpacaOrderResponse = resp
            .json()
            .await
            .context("Failed to parse Alpaca order response")?;

        Ok(OrderReceipt {
            order_id: parsed.id,
            client_order_id: parsed
                .client_order_id
                .unwrap_or_else(|| order.client_order_id.clone()),
            symbol: order.symbol.clone(),
            qty: order.qty,
            status: parsed.status.unwrap_or_else(|| "accepted".to_string()),
            submitted_at: parsed.submitted_at.unwrap_or_else(Utc::now),
            dry_run: false,
        })
    }

    fn name(&self) -> &'static str {
        GATEWAY_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
