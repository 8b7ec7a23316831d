//! Application state and top-level configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::batch::BatchResolver;
use crate::cache::{CacheConfig, MemoryCache};
use crate::client::{AdxConfig, SharedClient};
use crate::executor::QueryExecutor;
use crate::limiter::{LimiterConfig, RateLimiter};

/// Application state shared across all handlers.
///
/// This is the composition root: the cache, limiter and client are
/// constructed once here and injected into the executor and resolver
/// instead of living as process globals.
pub struct AppState {
    /// Single-query executor
    pub executor: Arc<QueryExecutor>,

    /// Batched latest-value resolver
    pub resolver: BatchResolver,

    /// Configuration
    pub config: ProxyConfig,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ProxyConfig) -> Self {
        let cache = Arc::new(MemoryCache::new(config.cache.capacity));
        let limiter = Arc::new(RateLimiter::new(config.limiter.clone()));
        let client = Arc::new(SharedClient::new(
            config.adx.clone(),
            config.client_retry_cooldown,
        ));

        let executor = Arc::new(QueryExecutor::new(
            cache.clone(),
            limiter,
            client,
            config.cache.clone(),
        ));
        let resolver = BatchResolver::new(executor.clone(), cache, config.cache.clone());

        Self { executor, resolver, config }
    }
}

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Port to listen on
    pub port: u16,

    /// Result cache configuration
    pub cache: CacheConfig,

    /// Rate limiter configuration
    pub limiter: LimiterConfig,

    /// Engine connection values; `None` runs the proxy in degraded mode
    pub adx: Option<AdxConfig>,

    /// How long a failed client construction is remembered before the
    /// next attempt. Zero re-attempts on every call.
    pub client_retry_cooldown: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cache: CacheConfig::default(),
            limiter: LimiterConfig::default(),
            adx: None,
            client_retry_cooldown: Duration::ZERO,
        }
    }
}

impl ProxyConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("ADX_PROXY_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cache: CacheConfig::from_env(),
            limiter: LimiterConfig::from_env(),
            adx: AdxConfig::from_env(),
            client_retry_cooldown: std::env::var("ADX_CLIENT_RETRY_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 8000);
        assert!(config.adx.is_none());
        assert_eq!(config.client_retry_cooldown, Duration::ZERO);
    }

    #[test]
    fn test_state_without_adx_config_is_degraded() {
        let state = AppState::new(ProxyConfig::default());
        let stats = state.executor.stats();
        assert!(!stats.client_available);
        assert_eq!(stats.queries_in_window, 0);
    }
}
