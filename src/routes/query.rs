//! Query execution endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::batch::MetricKind;
use crate::error::ProxyError;
use crate::state::AppState;
use crate::types::{MetricReading, Row};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// KQL query text
    pub query: String,

    #[serde(default = "default_true")]
    pub use_cache: bool,

    /// Cache under the long-lived historical TTL class
    #[serde(default)]
    pub historical: bool,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub rows: Vec<Row>,
}

/// Execute one ad hoc query
///
/// POST /api/query
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ProxyError> {
    if request.query.trim().is_empty() {
        return Err(ProxyError::InvalidRequest("query must not be empty".to_string()));
    }

    let ttl = request.historical.then(|| state.config.cache.historical_ttl);
    let rows = state.executor.run(&request.query, request.use_cache, ttl).await?;
    Ok(Json(QueryResponse { rows }))
}

#[derive(Debug, Deserialize)]
pub struct QueryBatchRequest {
    pub queries: Vec<String>,

    #[serde(default = "default_true")]
    pub use_cache: bool,
}

#[derive(Debug, Serialize)]
pub struct QueryBatchResponse {
    pub results: HashMap<String, Vec<Row>>,
}

/// Execute several ad hoc queries, served from cache where possible
///
/// POST /api/query/batch
pub async fn execute_query_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryBatchRequest>,
) -> Result<Json<QueryBatchResponse>, ProxyError> {
    let results = state.executor.run_many(&request.queries, request.use_cache).await?;
    Ok(Json(QueryBatchResponse { results }))
}

#[derive(Debug, Deserialize)]
pub struct LatestRequest {
    /// Device serial number
    pub serial: String,

    /// Requested metric or alarm names
    pub names: Vec<String>,

    #[serde(default = "default_true")]
    pub use_cache: bool,
}

#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub readings: BTreeMap<String, MetricReading>,
}

/// Latest value per requested telemetry name, in one engine query
///
/// POST /api/telemetry/latest
pub async fn telemetry_latest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LatestRequest>,
) -> Result<Json<LatestResponse>, ProxyError> {
    latest(state, request, MetricKind::Telemetry).await
}

/// Latest value per requested alarm name, in one engine query
///
/// POST /api/alarms/latest
pub async fn alarms_latest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LatestRequest>,
) -> Result<Json<LatestResponse>, ProxyError> {
    latest(state, request, MetricKind::Alarm).await
}

async fn latest(
    state: Arc<AppState>,
    request: LatestRequest,
    kind: MetricKind,
) -> Result<Json<LatestResponse>, ProxyError> {
    let readings = state
        .resolver
        .latest_batch(&request.serial, &request.names, kind, request.use_cache)
        .await?;
    Ok(Json(LatestResponse { readings }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_defaults() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"query": "Telemetry | take 1"}"#).unwrap();
        assert!(request.use_cache);
        assert!(!request.historical);
    }

    #[test]
    fn test_latest_request_defaults() {
        let request: LatestRequest =
            serde_json::from_str(r#"{"serial": "SN123", "names": ["battery_soc"]}"#).unwrap();
        assert!(request.use_cache);
        assert_eq!(request.names, vec!["battery_soc".to_string()]);
    }

    #[test]
    fn test_use_cache_can_be_disabled() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"query": "q", "use_cache": false}"#).unwrap();
        assert!(!request.use_cache);
    }
}
