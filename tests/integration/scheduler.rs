//! Scheduler and liveness endpoints running together.

use std::sync::Arc;
use std::time::Duration;

use bracketbot::config::TradingConfig;
use bracketbot::engine::executor::Executor;
use bracketbot::engine::market_data::MarketDataGateway;
use bracketbot::engine::scanner::ScanCycle;
use bracketbot::engine::scheduler::{Scheduler, SchedulerState};
use bracketbot::server;
use bracketbot::storage::TradeRecorder;
use bracketbot::strategy::DecisionEngine;
use bracketbot::types::TimeFrameUnit;
use tokio::sync::watch;

use crate::mock_broker::{flat_bars, MockBroker};

#[tokio::test]
async fn test_first_cycle_runs_immediately_and_shutdown_stops_sleep() {
    let mut recap = std::env::temp_dir();
    recap.push(format!("bracketbot_sched_{}.csv", uuid::Uuid::new_v4()));

    let broker = MockBroker::new()
        .with_bias_data("SPY")
        .with_bars("SPY", TimeFrameUnit::Minute, flat_bars(5, 25.0));
    let trading = TradingConfig::default();
    let engine = DecisionEngine::new(MarketDataGateway::new(Arc::new(broker.clone())), &trading);
    let executor = Executor::new(
        Arc::new(broker.clone()),
        TradeRecorder::new(&recap),
        trading.risk_budget,
    );
    let scan = Arc::new(ScanCycle::new(vec!["SPY".into()], engine, executor, trading.reason));

    let scheduler = Scheduler::new(scan, Duration::from_secs(3600));
    let mut state = scheduler.subscribe();
    let (tx, rx) = watch::channel(false);
    let handle = scheduler.spawn(rx);

    let orders = broker.clone();
    state
        .wait_for(|s| *s == SchedulerState::Sleeping && orders.orders().len() == 1)
        .await
        .unwrap();

    tx.send(true).unwrap();
    assert_eq!(handle.await.unwrap(), 1);
    assert_eq!(*state.borrow(), SchedulerState::Stopped);

    std::fs::remove_file(&recap).unwrap();
}

#[tokio::test]
async fn test_liveness_answers_while_serving() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (tx, mut rx) = watch::channel(false);
    let server = tokio::spawn(async move {
        server::serve("127.0.0.1", port, async move {
            let _ = rx.wait_for(|stop| *stop).await;
        })
        .await
    });

    let client = reqwest::Client::new();
    let mut body = None;
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("http://127.0.0.1:{port}/health")).send().await {
            body = Some(resp.json::<serde_json::Value>().await.unwrap());
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(body, Some(serde_json::json!({ "ok": true })));

    let root: serde_json::Value = client
        .get(format!("http://127.0.0.1:{port}/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(root["status"], "Bot is running!");

    tx.send(true).unwrap();
    server.await.unwrap().unwrap();
}
