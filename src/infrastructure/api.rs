//! API Server (Cold Path)
//!
//! Read-only views of the cache and ingest statistics, an operator reset, and
//! an inbound bridge that lets an out-of-process driver adapter post raw
//! packets into the queue.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::Level;

use crate::core::{OwnedPacket, Quote, RecordFamily};
use crate::hot_path::StockCache;
use crate::infrastructure::metrics::{IngestStats, StatsSnapshot};
use crate::infrastructure::queue::PacketQueue;
use crate::FeedError;

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
}

/// Ingest statistics plus cache and queue state
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
    pub ingest: StatsSnapshot,
    pub quote_count: usize,
    pub symbol_count: usize,
    pub queue_depth: usize,
    pub queue_dropped: u64,
    pub change_notifications: u64,
}

#[derive(Debug, Serialize)]
pub struct NameDto {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PacketParams {
    pub count: i32,
    #[serde(default)]
    pub data_type: u16,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<StockCache>,
    pub stats: Arc<IngestStats>,
    pub queue: Arc<PacketQueue>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/stats", get(get_stats))
        .route("/api/quotes", get(list_quotes))
        .route("/api/quotes/:code", get(get_quote))
        .route("/api/names", get(list_names))
        .route("/api/names/:code", get(get_name))
        .route("/api/packets/:family", post(post_packet))
        .route("/api/cache/clear", post(clear_cache))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server; returns once `shutdown` resolves
pub async fn start_server<F>(state: AppState, port: u16, shutdown: F) -> Result<(), FeedError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    crate::log_api!(Level::INFO, %addr, "API Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn health() -> Json<HealthDto> {
    Json(HealthDto { status: "ok" })
}

async fn get_stats(State(state): State<AppState>) -> Json<StatsDto> {
    Json(StatsDto {
        ingest: state.stats.snapshot(),
        quote_count: state.cache.quote_count(),
        symbol_count: state.cache.symbol_count(),
        queue_depth: state.queue.len(),
        queue_dropped: state.queue.dropped(),
        change_notifications: state.cache.notifier().fired(),
    })
}

/// Every cached quote, sorted by code
async fn list_quotes(State(state): State<AppState>) -> Json<Vec<Quote>> {
    let mut quotes = state.cache.quotes_snapshot();
    quotes.sort_by(|a, b| a.code.cmp(&b.code));
    Json(quotes)
}

async fn list_names(State(state): State<AppState>) -> Json<HashMap<String, String>> {
    Json(state.cache.symbol_table_snapshot())
}

async fn get_quote(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Quote>, StatusCode> {
    state
        .cache
        .lookup_quote(&code)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_name(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<NameDto>, StatusCode> {
    let name = state.cache.lookup_name(&code).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(NameDto {
        code: crate::core::normalize(&code),
        name,
    }))
}

/// Copy the body into an owned packet and queue it
async fn post_packet(
    State(state): State<AppState>,
    Path(family): Path<String>,
    Query(params): Query<PacketParams>,
    body: Bytes,
) -> StatusCode {
    let family: RecordFamily = match family.parse() {
        Ok(family) => family,
        Err(e) => {
            crate::log_api!(Level::WARN, error = %e, "packet rejected");
            return StatusCode::BAD_REQUEST;
        }
    };

    let packet = OwnedPacket::new(family, params.data_type, params.count, body);
    match state.queue.push(packet) {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            crate::log_api!(Level::WARN, error = %e, "packet not queued");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    crate::log_api!(Level::INFO, "operator cache reset");
    state.cache.clear();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hot_path::ChangeNotifier;
    use crate::infrastructure::config::QueueConfig;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> AppState {
        let notifier = Arc::new(ChangeNotifier::new(Duration::from_millis(500)));
        let (queue, _parker) = PacketQueue::new(&QueueConfig::default());
        AppState {
            cache: Arc::new(StockCache::new(50_000, notifier)),
            stats: Arc::new(IngestStats::new()),
            queue,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(state())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_quote_lookup_normalizes() {
        let state = state();
        let mut quote = Quote::new("600000");
        quote.price = 10.5;
        state.cache.upsert_quote(quote);

        let response = router(state.clone())
            .oneshot(Request::get("/api/quotes/600000").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["code"], "SH600000");
        assert_eq!(json["price"], 10.5);

        let response = router(state)
            .oneshot(Request::get("/api/quotes/000001").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_quotes_and_names() {
        let state = state();
        state.cache.upsert_quote(Quote::new("000001"));
        state.cache.upsert_quote(Quote::new("600000"));
        state.cache.upsert_symbol("600036", "招商银行");

        let response = router(state.clone())
            .oneshot(Request::get("/api/quotes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[0]["code"], "SH600000");
        assert_eq!(json[1]["code"], "SZ000001");

        let response = router(state)
            .oneshot(Request::get("/api/names").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["SH600036"], "招商银行");
    }

    #[tokio::test]
    async fn test_name_lookup() {
        let state = state();
        state.cache.upsert_symbol("600036", "招商银行");

        let response = router(state)
            .oneshot(Request::get("/api/names/sh600036").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["code"], "SH600036");
        assert_eq!(json["name"], "招商银行");
    }

    #[tokio::test]
    async fn test_post_packet_enqueues() {
        let state = state();
        let response = router(state.clone())
            .oneshot(
                Request::post("/api/packets/quote?count=1")
                    .body(Body::from(vec![0u8; 158]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(state.queue.realtime_len(), 1);

        let response = router(state)
            .oneshot(
                Request::post("/api/packets/daily?count=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let state = state();
        state.cache.upsert_quote(Quote::new("600000"));

        let response = router(state.clone())
            .oneshot(Request::post("/api/cache/clear").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router(state)
            .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["quoteCount"], 0);
        assert_eq!(json["ingest"]["packetsReceived"], 0);
    }
}
