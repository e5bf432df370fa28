//! Core engine: the scan → decide → execute cycle and its scheduler.

pub mod market_data;
pub mod executor;
pub mod scanner;
pub mod scheduler;
