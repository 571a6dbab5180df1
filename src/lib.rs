//! Quotation packet ingestion
//!
//! Decodes binary packets from a quotation driver into typed market records,
//! keeps an authoritative quote and symbol-name cache, and republishes results
//! as events.

pub mod core;
pub mod decode;
pub mod engine;
pub mod hot_path;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use engine::{IngestionCoordinator, PacketReport};
pub use infrastructure::config::{Config, ConfigError};

use thiserror::Error;

/// Main error type for the ingest service
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Decode error: {0}")]
    Decode(#[from] decode::DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] infrastructure::QueueError),

    #[error("API error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FeedError>;
