//! Infrastructure - cold path only
//!
//! This module contains non-latency-critical code:
//! - Configuration management
//! - Logging and ingest statistics
//! - Packet queue and its worker thread
//! - HTTP API

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod queue;

pub use api::{start_server, AppState};
pub use metrics::{IngestStats, StatsSnapshot};
pub use queue::{PacketHandler, PacketQueue, QueueError, QueueWorker};
