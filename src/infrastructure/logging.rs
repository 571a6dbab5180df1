//! Centralized file-based logging system
//!
//! Writes logs to files under the configured directory, separated by log type:
//! - main/ - General application logs (JSON)
//! - error/ - Error and warning logs only
//! - decode/ - Record decoding failures and packet progress
//! - cache/ - Cache merges, resets and soft-limit warnings
//! - ingest/ - Packet queue and coordinator logs
//! - api/ - API server logs

use crate::infrastructure::config::LoggingConfig;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Per-target log files
const TARGETS: [&str; 4] = ["decode", "cache", "ingest", "api"];

/// Initialize centralized file logging
///
/// Creates the log directories and sets up file appenders for each log type.
/// Returns the WorkerGuards which must be kept alive for the duration of the program.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<Vec<WorkerGuard>> {
    let root = config.directory.as_path();
    for log_type in ["main", "error"].iter().chain(TARGETS.iter()) {
        fs::create_dir_all(root.join(log_type))?;
    }

    let mut guards = Vec::new();

    // Main log - all logs
    let (main_appender, main_guard) = create_appender(root, "main");
    guards.push(main_guard);

    // Error log - ERROR and WARN only
    let (error_appender, error_guard) = create_appender(root, "error");
    guards.push(error_guard);

    let main_layer = tracing_subscriber::fmt::layer()
        .with_writer(main_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json();

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::WARN);

    // One file per event target
    let mut target_layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> =
        Vec::with_capacity(TARGETS.len());
    for target in TARGETS {
        let (appender, guard) = create_appender(root, target);
        guards.push(guard);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(appender)
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_filter(tracing_subscriber::filter::filter_fn(move |metadata| {
                metadata.target() == target
            }))
            .boxed();
        target_layers.push(layer);
    }

    // Console layer for development
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Initialize subscriber with all layers
    tracing_subscriber::registry()
        .with(target_layers)
        .with(filter)
        .with(main_layer)
        .with(error_layer)
        .with(console_layer)
        .init();

    tracing::info!(
        directory = %root.display(),
        "Logging system initialized"
    );

    Ok(guards)
}

/// Create a daily rolling file appender
fn create_appender(root: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, root.join(name), name);

    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    (non_blocking, guard)
}

/// Log macro helpers for specific log types
#[macro_export]
macro_rules! log_decode {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "decode", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_cache {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "cache", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_ingest {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "ingest", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_api {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "api", $level, $($arg)+)
    };
}
