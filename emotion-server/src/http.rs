//! Emotion Tracker HTTP API
//!
//! Axum server exposing the record store. Each endpoint has a thin handler
//! that delegates to an inner function returning `(StatusCode, Value)`, so the
//! business logic can be exercised without going through the router.
//!
//! Endpoints:
//! - GET  /          — liveness text
//! - GET  /health    — store health probe
//! - POST /emotion   — validate and store an emotion record
//! - GET  /emotions  — all records, most recent first

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use emotion_core::config::ValidationConfig;
use emotion_core::{validate_bytes, EmotionConfig, RecordStore};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::cors::{self, AllowList};
use crate::error::ApiError;

pub const LIVENESS_MESSAGE: &str = "Emotion Tracker Backend is live!";
pub const SAVED_MESSAGE: &str = "Emotion data saved successfully!";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<dyn RecordStore>,
    pub config: EmotionConfig,
}

/// Build the Axum router with all endpoints and the cross-origin policy.
pub fn build_router(state: Arc<HttpState>) -> Router {
    let allow_list = Arc::new(AllowList::from(&state.config.cors));
    let cors = cors::cors_layer(
        &allow_list,
        Duration::from_secs(state.config.cors.max_age_seconds),
    );
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/emotion", post(create_emotion_handler))
        .route("/emotions", get(list_emotions_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(middleware::from_fn_with_state(allow_list, cors::origin_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on the configured address until the shutdown signal fires, then
/// drain in-flight requests.
pub async fn start_http_server(
    store: Arc<dyn RecordStore>,
    config: EmotionConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(HttpState { store, config });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Emotion Tracker listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — probes the store.
pub async fn health_inner(store: &dyn RecordStore) -> (StatusCode, serde_json::Value) {
    match store.ping().await {
        Ok(database) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "database": database,
            }),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unhealthy",
                    "version": env!("CARGO_PKG_VERSION"),
                }),
            )
        }
    }
}

/// Inner create — validates the raw body and stores the record.
pub async fn create_emotion_inner(
    store: &dyn RecordStore,
    rules: &ValidationConfig,
    body: &[u8],
) -> (StatusCode, serde_json::Value) {
    let emotions = match validate_bytes(body, rules) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Invalid emotion data: {}", e);
            return ApiError::from(e).into_parts();
        }
    };

    match store.insert_record(emotions.into_inner()).await {
        Ok(record) => {
            tracing::info!(
                id = %record.id,
                entries = record.emotions.len(),
                "Emotion data saved"
            );
            (
                StatusCode::CREATED,
                serde_json::json!({ "message": SAVED_MESSAGE }),
            )
        }
        Err(e) => {
            tracing::error!("Error saving emotion data: {}", e);
            ApiError::SaveFailed(e).into_parts()
        }
    }
}

/// Inner list — every record, most recent first.
pub async fn list_emotions_inner(store: &dyn RecordStore) -> (StatusCode, serde_json::Value) {
    let records = match store.list_records_descending().await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Error retrieving emotions: {}", e);
            return ApiError::ListFailed(e).into_parts();
        }
    };

    match serde_json::to_value(&records) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!("Error serializing emotion records: {}", e);
            ApiError::Internal(e.to_string()).into_parts()
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn root_handler() -> &'static str {
    LIVENESS_MESSAGE
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn create_emotion_handler(
    State(state): State<Arc<HttpState>>,
    body: Bytes,
) -> impl IntoResponse {
    let (status, body) =
        create_emotion_inner(state.store.as_ref(), &state.config.validation, &body).await;
    (status, Json(body))
}

pub async fn list_emotions_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = list_emotions_inner(state.store.as_ref()).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use emotion_core::MemoryRecordStore;

    const SCENARIO: &str = r#"{"emotions":[{"emotion":"happy","confidence":0.92},{"emotion":"surprised","confidence":0.05}]}"#;

    #[tokio::test]
    async fn test_create_inner_saves_record() {
        let store = MemoryRecordStore::new();

        let (status, body) =
            create_emotion_inner(&store, &ValidationConfig::default(), SCENARIO.as_bytes()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], SAVED_MESSAGE);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_inner_empty_object_is_bad_request() {
        let store = MemoryRecordStore::new();

        let (status, body) =
            create_emotion_inner(&store, &ValidationConfig::default(), b"{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("emotions"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_inner_relaxed_empty_array() {
        let store = MemoryRecordStore::new();
        let rules = ValidationConfig {
            allow_empty: true,
            ..Default::default()
        };

        let (status, _) = create_emotion_inner(&store, &rules, br#"{"emotions":[]}"#).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = list_emotions_inner(&store).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["emotions"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_list_inner_returns_array() {
        let store = MemoryRecordStore::new();

        let (status, body) = list_emotions_inner(&store).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        create_emotion_inner(&store, &ValidationConfig::default(), SCENARIO.as_bytes()).await;
        let (_, body) = list_emotions_inner(&store).await;
        let first = &body[0];
        assert!(first["id"].is_string());
        assert!(first["timestamp"].is_string());
        assert_eq!(first["emotions"][0]["emotion"], "happy");
        assert_eq!(first["emotions"][1]["confidence"], 0.05);
    }

    #[tokio::test]
    async fn test_health_inner_memory_store() {
        let store = MemoryRecordStore::new();

        let (status, body) = health_inner(&store).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "memory");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
