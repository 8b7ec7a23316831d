//! Single-query execution: cache lookup, admission check, engine call,
//! cache store.
//!
//! Failures below this layer are absorbed: an unavailable client or a
//! failed engine call degrade to empty rows so the service stays up when
//! the backing store is unhealthy. Rate limiting is the one condition
//! surfaced to callers, because backing off is the correct reaction to it
//! and "no data" is not.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::cache::{self, CacheConfig, CacheMetrics, CacheStats, CacheStore};
use crate::client::{EngineError, QueryEngine};
use crate::error::ProxyError;
use crate::limiter::RateLimiter;
use crate::metrics;
use crate::types::{Row, StatsSnapshot};

/// How much of a failing query is kept in log output.
const LOG_QUERY_CHARS: usize = 200;

/// Orchestrates one query through cache, limiter and engine.
pub struct QueryExecutor {
    cache: Arc<dyn CacheStore>,
    limiter: Arc<RateLimiter>,
    engine: Arc<dyn QueryEngine>,
    cache_config: CacheConfig,
    cache_metrics: CacheMetrics,
}

impl QueryExecutor {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        limiter: Arc<RateLimiter>,
        engine: Arc<dyn QueryEngine>,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            cache,
            limiter,
            engine,
            cache_config,
            cache_metrics: CacheMetrics::new(),
        }
    }

    /// Execute one query with caching and rate limiting.
    ///
    /// A cache hit returns immediately and bypasses the admission check.
    /// On a miss the limiter decides: denial is the only error callers
    /// see. An unavailable client or a failed engine call both return
    /// empty rows, distinguishable only in logs and metrics.
    pub async fn run(
        &self,
        query: &str,
        use_cache: bool,
        ttl_override: Option<Duration>,
    ) -> Result<Vec<Row>, ProxyError> {
        let key = cache::query_key(query);

        if use_cache {
            if let Some(rows) = self.cached_rows(&key).await {
                debug!(key_tail = cache::key_tail(&key), "cache hit");
                return Ok(rows);
            }
            debug!(key_tail = cache::key_tail(&key), "cache miss");
        }

        if !self.limiter.is_allowed() {
            warn!("query rejected due to rate limiting");
            metrics::record_rate_limited();
            return Err(ProxyError::RateLimited);
        }

        let started = Instant::now();
        let rows = match self.engine.execute(query).await {
            Ok(rows) => rows,
            Err(EngineError::Unavailable) => {
                debug!("query client not available, returning no rows");
                metrics::record_query("unavailable");
                metrics::set_client_available(false);
                return Ok(Vec::new());
            }
            Err(EngineError::Execution(e)) => {
                error!(
                    error = %e,
                    query = %truncate(query, LOG_QUERY_CHARS),
                    "query failed"
                );
                metrics::record_query("error");
                metrics::observe_query_duration(started.elapsed().as_secs_f64());
                return Ok(Vec::new());
            }
        };

        metrics::record_query("success");
        metrics::observe_query_duration(started.elapsed().as_secs_f64());
        metrics::set_client_available(true);
        info!(
            rows = rows.len(),
            rate = self.limiter.current_rate(),
            "query executed"
        );

        if use_cache {
            let ttl = ttl_override.unwrap_or(self.cache_config.default_ttl);
            match serde_json::to_vec(&rows) {
                Ok(payload) => {
                    self.cache.set(&key, payload, ttl).await;
                    self.cache_metrics.record_put();
                }
                Err(e) => warn!(error = %e, "failed to serialize rows for caching"),
            }
        }

        Ok(rows)
    }

    /// Execute a set of queries, serving what the cache can and running
    /// the rest individually. Each query goes through `run`, which owns
    /// the single cache lookup per query and the hit/miss accounting. No
    /// cross-query batching happens here; that is the batch resolver's
    /// job.
    pub async fn run_many(
        &self,
        queries: &[String],
        use_cache: bool,
    ) -> Result<HashMap<String, Vec<Row>>, ProxyError> {
        let mut results = HashMap::with_capacity(queries.len());
        for query in queries {
            let rows = self.run(query, use_cache, None).await?;
            results.insert(query.clone(), rows);
        }
        Ok(results)
    }

    /// Snapshot of throttle occupancy and configuration. Never mutates
    /// admission state.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            queries_in_window: self.limiter.current_rate(),
            max_per_window: self.limiter.config().max_requests,
            window_secs: self.limiter.config().window.as_secs(),
            default_ttl_secs: self.cache_config.default_ttl.as_secs(),
            client_available: self.engine.is_available(),
        }
    }

    /// Snapshot of cache effectiveness counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache_metrics.snapshot()
    }

    async fn cached_rows(&self, key: &str) -> Option<Vec<Row>> {
        let payload = self.cache.get(key).await;
        let rows = payload.and_then(|bytes| serde_json::from_slice::<Vec<Row>>(&bytes).ok());
        match rows {
            // An undecodable payload counts as a miss and gets overwritten.
            Some(rows) => {
                self.cache_metrics.record_hit();
                metrics::record_cache_hit("query");
                Some(rows)
            }
            None => {
                self.cache_metrics.record_miss();
                metrics::record_cache_miss("query");
                None
            }
        }
    }
}

fn truncate(query: &str, max_chars: usize) -> String {
    query.chars().take(max_chars).collect()
}
