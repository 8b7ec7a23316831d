//! Health, stats and metrics endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Health check endpoint
///
/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.executor.stats();
    let status = if stats.client_available { "healthy" } else { "degraded" };

    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "client_available": stats.client_available,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Live check (for Kubernetes)
///
/// GET /live
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}

/// Throttle and cache statistics
///
/// GET /stats
pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let throttle = state.executor.stats();
    let cache = state.executor.cache_stats();

    Json(json!({
        "throttle": {
            "queries_in_window": throttle.queries_in_window,
            "max_per_window": throttle.max_per_window,
            "window_secs": throttle.window_secs
        },
        "cache": {
            "default_ttl_secs": throttle.default_ttl_secs,
            "hits": cache.hits,
            "misses": cache.misses,
            "puts": cache.puts,
            "hit_rate": cache.hit_rate
        },
        "client_available": throttle.client_available
    }))
}

/// Metrics in Prometheus text format
///
/// GET /metrics
pub async fn metrics_prometheus() -> impl IntoResponse {
    crate::metrics::encode_metrics()
}
