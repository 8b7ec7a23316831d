//! Shared client handle for the backing query engine.
//!
//! One handle exists per process, constructed lazily from the five
//! connection values and reused by every caller. Missing configuration or
//! a construction failure put the proxy in degraded mode: queries return
//! no rows instead of failing the service.

mod auth;
mod config;
mod handle;

pub use config::AdxConfig;
pub use handle::KustoHandle;

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::types::Row;

/// Errors from the transport, auth and parse layers. Never surfaced to
/// proxy callers; the executor absorbs them into empty results.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Cluster value does not parse as a URL
    #[error("invalid cluster URL: {0}")]
    InvalidClusterUrl(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token endpoint rejected the credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The engine answered with a non-success status
    #[error("query engine returned {status}: {body}")]
    Query { status: u16, body: String },

    /// The engine answered with a body the proxy cannot interpret
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Failure modes at the executor/engine seam.
///
/// `Unavailable` (no usable handle) and `Execution` (the engine call
/// failed) are distinguished so the executor can log and count them
/// separately, even though callers see empty rows either way.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No client handle could be constructed
    #[error("query client not available")]
    Unavailable,

    /// The engine call itself failed
    #[error(transparent)]
    Execution(#[from] ClientError),
}

/// The seam between the executor and whatever executes queries. The
/// production implementation is [`SharedClient`]; tests substitute fakes.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Execute one query against the engine.
    async fn execute(&self, query: &str) -> Result<Vec<Row>, EngineError>;

    /// Whether a handle has been constructed for this process.
    fn is_available(&self) -> bool;
}

/// Process-wide client handle with double-checked lazy initialization.
///
/// Reads after initialization take the unlocked fast path; construction
/// happens at most logically once, under the init mutex. Whether a failed
/// construction is retried on the next call is a policy choice: with a
/// zero cooldown (the default) every call re-attempts, so transient
/// configuration or network trouble self-heals; a positive cooldown caches
/// the failure for that long to shed repeated attempts under load.
pub struct SharedClient {
    config: Option<AdxConfig>,
    handle: RwLock<Option<Arc<KustoHandle>>>,
    init: tokio::sync::Mutex<()>,
    failure_cooldown: Duration,
    last_failure: std::sync::Mutex<Option<Instant>>,
}

impl SharedClient {
    pub fn new(config: Option<AdxConfig>, failure_cooldown: Duration) -> Self {
        if config.is_none() {
            warn!("ADX configuration incomplete - live queries disabled");
        }
        Self {
            config,
            handle: RwLock::new(None),
            init: tokio::sync::Mutex::new(()),
            failure_cooldown,
            last_failure: std::sync::Mutex::new(None),
        }
    }

    /// Fetch the shared handle, constructing it on first use. `None` means
    /// degraded mode: missing configuration, a failed construction, or a
    /// failure still inside the cooldown.
    pub async fn get(&self) -> Option<Arc<KustoHandle>> {
        if let Some(handle) = self.read_handle() {
            return Some(handle);
        }
        let config = self.config.as_ref()?;

        let _guard = self.init.lock().await;
        if let Some(handle) = self.read_handle() {
            return Some(handle);
        }
        if self.in_cooldown() {
            debug!("client construction skipped, failure cooldown active");
            return None;
        }

        match KustoHandle::connect(config) {
            Ok(handle) => {
                let handle = Arc::new(handle);
                *self.handle.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
                    Some(handle.clone());
                info!("ADX client initialized");
                Some(handle)
            }
            Err(e) => {
                error!(error = %e, "failed to initialize ADX client");
                *self
                    .last_failure
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
                None
            }
        }
    }

    fn read_handle(&self) -> Option<Arc<KustoHandle>> {
        self.handle
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn in_cooldown(&self) -> bool {
        if self.failure_cooldown.is_zero() {
            return false;
        }
        self.last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .map(|at| at.elapsed() < self.failure_cooldown)
            .unwrap_or(false)
    }
}

#[async_trait]
impl QueryEngine for SharedClient {
    async fn execute(&self, query: &str) -> Result<Vec<Row>, EngineError> {
        let handle = self.get().await.ok_or(EngineError::Unavailable)?;
        Ok(handle.execute(query).await?)
    }

    fn is_available(&self) -> bool {
        self.read_handle().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AdxConfig {
        AdxConfig {
            cluster: "https://cluster.example.kusto.windows.net".to_string(),
            database: "telemetry".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            tenant_id: "tenant".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_config_yields_absent_handle() {
        let client = SharedClient::new(None, Duration::ZERO);
        assert!(client.get().await.is_none());
        assert!(!client.is_available());

        let result = client.execute("Telemetry | take 1").await;
        assert!(matches!(result, Err(EngineError::Unavailable)));
    }

    #[tokio::test]
    async fn test_handle_constructed_once_and_shared() {
        let client = SharedClient::new(Some(valid_config()), Duration::ZERO);
        let first = client.get().await.unwrap();
        let second = client.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(client.is_available());
    }

    #[tokio::test]
    async fn test_construction_failure_leaves_handle_absent() {
        let mut config = valid_config();
        config.cluster = "not a url".to_string();
        let client = SharedClient::new(Some(config), Duration::ZERO);

        assert!(client.get().await.is_none());
        assert!(!client.is_available());
        // zero cooldown: the next call attempts construction again
        assert!(!client.in_cooldown());
    }

    #[tokio::test]
    async fn test_failure_cooldown_suppresses_reattempts() {
        let mut config = valid_config();
        config.cluster = "not a url".to_string();
        let client = SharedClient::new(Some(config), Duration::from_secs(60));

        assert!(client.get().await.is_none());
        assert!(client.in_cooldown());
        assert!(client.get().await.is_none());
    }
}
