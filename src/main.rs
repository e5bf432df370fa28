//! bracketbot entry point.
//!
//! Loads configuration, initialises structured logging, resolves brokerage
//! credentials (fatal if missing), starts the scan scheduler on a background
//! task, and serves the liveness endpoints on the main task until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use bracketbot::broker::alpaca::AlpacaClient;
use bracketbot::broker::{DryRunGateway, OrderGateway};
use bracketbot::config::{AppConfig, BrokerCredentials};
use bracketbot::engine::executor::Executor;
use bracketbot::engine::market_data::MarketDataGateway;
use bracketbot::engine::scanner::ScanCycle;
use bracketbot::engine::scheduler::Scheduler;
use bracketbot::server;
use bracketbot::storage::TradeRecorder;
use bracketbot::strategy::DecisionEngine;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load(CONFIG_PATH)?;
    init_logging();

    info!(
        agent_name = %cfg.agent.name,
        scan_interval_secs = cfg.agent.scan_interval_secs,
        watchlist = ?cfg.agent.watchlist,
        dry_run = cfg.trading.dry_run,
        "bracketbot starting up"
    );

    // -- Brokerage -------------------------------------------------------

    let credentials = BrokerCredentials::from_env(&cfg.broker)
        .context("Brokerage credentials are required")?;
    info!(base_url = %credentials.base_url, data_url = %cfg.broker.data_url, "Credentials loaded");

    let alpaca = Arc::new(AlpacaClient::new(
        &credentials,
        &cfg.broker.data_url,
        &cfg.broker.feed,
        Duration::from_secs(cfg.broker.request_timeout_secs),
    )?);

    let orders: Arc<dyn OrderGateway> = if cfg.trading.dry_run {
        info!("Dry-run mode: orders are logged, not submitted");
        Arc::new(DryRunGateway)
    } else {
        alpaca.clone()
    };

    // -- Engine ----------------------------------------------------------

    let market_data = MarketDataGateway::new(alpaca);
    let engine = DecisionEngine::new(market_data, &cfg.trading);
    let executor = Executor::new(
        orders,
        TradeRecorder::new(&cfg.recap.path),
        cfg.trading.risk_budget,
    );
    let scan = Arc::new(ScanCycle::new(
        cfg.agent.watchlist.clone(),
        engine,
        executor,
        cfg.trading.reason.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(scan, cfg.scan_interval()).spawn(shutdown_rx);

    // -- Liveness server (blocks until Ctrl+C) ----------------------------

    let served = server::serve(&cfg.server.host, cfg.server.port, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received.");
    })
    .await;

    let _ = shutdown_tx.send(true);
    match scheduler.await {
        Ok(cycles) => info!(cycles, "bracketbot shut down cleanly."),
        Err(e) => error!(error = %e, "Scheduler task failed"),
    }

    served
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bracketbot=info"));

    if std::env::var("BRACKETBOT_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
