//! Periodic cycle scheduler.
//!
//! Two states: `Running` while a cycle executes, `Sleeping` for the fixed
//! interval after it completes. Cycles never overlap. Shutdown is observed
//! only while sleeping, so an in-flight cycle always finishes.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::types::CycleReport;

/// Something that can run one full cycle.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> CycleReport;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Sleeping,
    Stopped,
}

pub struct Scheduler<R: CycleRunner> {
    runner: Arc<R>,
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl<R: CycleRunner + 'static> Scheduler<R> {
    pub fn new(runner: Arc<R>, interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Sleeping);
        Self {
            runner,
            interval,
            state,
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Run exactly one cycle and log its report.
    pub async fn run_once(&self) -> CycleReport {
        self.state.send_replace(SchedulerState::Running);
        let report = self.runner.run_cycle().await;
        log_cycle_report(&report);
        self.state.send_replace(SchedulerState::Sleeping);
        report
    }

    /// Run cycles until `shutdown` flips to `true` (or its sender drops).
    /// Returns the number of completed cycles.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(interval_secs = self.interval.as_secs(), "Scheduler started");
        let mut completed = 0u64;

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_once().await;
            completed += 1;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        info!(cycles = completed, "Scheduler stopped");
        completed
    }

    /// Run on a background task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<u64> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Log a human-readable cycle summary.
fn log_cycle_report(report: &CycleReport) {
    info!(
        cycle = report.cycle_number,
        scanned = report.symbols_scanned,
        submitted = report.orders_submitted,
        skipped = report.skipped,
        failed = report.failed,
        recap_failures = report.recap_failures,
        "Cycle complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
