//! End-to-end tests driving the scan cycle against an in-memory broker.

mod mock_broker;
mod scan_cycle;
mod scheduler;
