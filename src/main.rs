//! Quote ingest service
//!
//! # Architecture
//! - **core**: Stock codes, market data types, packets
//! - **decode**: Binary record decoders, one per record family
//! - **hot_path**: Stock cache, debounced change notification, event fan-out
//! - **engine**: Ingestion coordinator
//! - **infrastructure**: Cold path (config, logging, stats, queue, api)

use quote_ingest::hot_path::{ChangeNotifier, EventBus, EventKind, MarketEvent, StockCache};
use quote_ingest::infrastructure::logging::init_logging;
use quote_ingest::infrastructure::{start_server, AppState, IngestStats, PacketQueue, QueueError};
use quote_ingest::{Config, IngestionCoordinator, Result};
use std::sync::Arc;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let _log_guards = init_logging(&config.logging)?;

    tracing::info!("Starting quote ingest service...");

    // 1. Cache, change notification and event bus
    let notifier = Arc::new(ChangeNotifier::new(config.debounce_interval()));
    let cache = Arc::new(StockCache::new(config.cache.soft_limit, notifier.clone()));
    let bus = Arc::new(EventBus::new());
    let stats = Arc::new(IngestStats::new());

    let notifier_task = {
        let notifier = notifier.clone();
        let bus = bus.clone();
        tokio::spawn(async move {
            notifier
                .run(|| {
                    bus.publish(MarketEvent::CacheChanged);
                })
                .await
        })
    };

    let change_log_task = {
        let mut changes = bus.subscribe_to(&[EventKind::CacheChanged]);
        let cache = cache.clone();
        tokio::spawn(async move {
            while changes.recv().await.is_some() {
                quote_ingest::log_cache!(Level::DEBUG, summary = %cache.summary(), "cache changed");
            }
        })
    };

    // 2. Coordinator behind the packet queue
    let coordinator = Arc::new(IngestionCoordinator::from_config(
        &config,
        cache.clone(),
        bus.clone(),
        stats.clone(),
    )?);
    let (queue, worker) = PacketQueue::start(&config.queue, coordinator)?;

    // 3. API server (cold path)
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let api_task = if config.api.enabled {
        let state = AppState {
            cache: cache.clone(),
            stats: stats.clone(),
            queue: queue.clone(),
        };
        let port = config.api.port;
        Some(tokio::spawn(start_server(state, port, async move {
            let _ = stop_rx.await;
        })))
    } else {
        None
    };

    tracing::info!("Service running. Press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    let _ = stop_tx.send(());
    if let Some(api_task) = api_task {
        match api_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("API Server failed: {}", e),
            Err(e) => tracing::error!("API Server task failed: {}", e),
        }
    }

    // Worker drains what is queued before it exits
    tokio::task::spawn_blocking(move || worker.shutdown())
        .await
        .map_err(|e| QueueError::WorkerJoin(e.to_string()))?;

    notifier_task.abort();
    change_log_task.abort();

    let snapshot = stats.snapshot();
    tracing::info!(
        packets = snapshot.packets_received,
        quotes = snapshot.quotes_decoded,
        errors = snapshot.decode_errors,
        dropped = queue.dropped(),
        cache = %cache.summary(),
        "Stopped"
    );

    Ok(())
}
