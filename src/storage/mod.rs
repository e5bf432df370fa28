//! Persistence layer.
//!
//! Appends one line per executed trade to the recap log. The file is
//! opened in append mode for every write and closed before returning, so
//! a crash never leaves a half-owned handle behind.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

use crate::types::RecapRecord;

/// Append-only writer for trade recaps.
#[derive(Debug, Clone)]
pub struct TradeRecorder {
    path: PathBuf,
}

impl TradeRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append a recap line, creating the file if absent.
    pub fn append(&self, record: &RecapRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open recap log {}", self.path.display()))?;

        file.write_all(record.to_line().as_bytes())
            .with_context(|| format!("Failed to write recap log {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("Failed to flush recap log {}", self.path.display()))?;
        Ok(())
    }

    /// Append and log the outcome. Never propagates; the returned error
    /// text is only for reporting.
    pub fn record(&self, record: &RecapRecord) -> Option<String> {
        match self.append(record) {
            Ok(()) => {
                info!(symbol = %record.symbol, path = %self.path.display(), "Trade recap saved");
                None
            }
            Err(e) => {
                error!(symbol = %record.symbol, error = %format!("{e:#}"), "Failed to save trade recap");
                Some(format!("{e:#}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
