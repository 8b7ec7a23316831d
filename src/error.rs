//! Error types for the ADX proxy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors surfaced to proxy callers.
///
/// Rate limiting is the only condition a well-behaved caller should react
/// to differently (back off and retry); everything below it degrades to
/// empty results instead of erroring.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Admission denied by the rate limiter
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    /// Request validation error
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": format!("{:?}", self).split('(').next().unwrap_or("Unknown"),
            }
        }));

        (status, body).into_response()
    }
}
