//! Batch resolution of latest telemetry and alarm values.
//!
//! The engine bills per query scan, so this module folds N single-metric
//! lookups into one "latest value per name" query and maps the engine's
//! substring-matched row names back onto the names the caller asked for.
//! The fuzzy mapping exists because metric naming in the data store is not
//! guaranteed to match caller-side naming conventions (path prefixes may
//! differ).

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{self, CacheConfig, CacheStore};
use crate::error::ProxyError;
use crate::executor::QueryExecutor;
use crate::metrics;
use crate::types::{MetricReading, Row};

/// Which table and matching operator a batch lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Telemetry,
    Alarm,
}

impl MetricKind {
    fn table(self) -> &'static str {
        match self {
            MetricKind::Telemetry => "Telemetry",
            MetricKind::Alarm => "Alarms",
        }
    }

    // `contains` and `has` give functionally equivalent substring
    // semantics for these names; the operator differs per table.
    fn name_operator(self) -> &'static str {
        match self {
            MetricKind::Telemetry => "contains",
            MetricKind::Alarm => "has",
        }
    }

    fn value_column(self) -> &'static str {
        match self {
            MetricKind::Telemetry => "value_double",
            MetricKind::Alarm => "value",
        }
    }

    fn cache_prefix(self) -> &'static str {
        match self {
            MetricKind::Telemetry => "batch_telemetry",
            MetricKind::Alarm => "batch_alarms",
        }
    }
}

/// Resolves a set of requested names against one batched engine query.
pub struct BatchResolver {
    executor: Arc<QueryExecutor>,
    cache: Arc<dyn CacheStore>,
    cache_config: CacheConfig,
}

impl BatchResolver {
    pub fn new(
        executor: Arc<QueryExecutor>,
        cache: Arc<dyn CacheStore>,
        cache_config: CacheConfig,
    ) -> Self {
        Self { executor, cache, cache_config }
    }

    /// Fetch the latest value for each requested name in one engine query.
    ///
    /// Requested names with no exact or substring match are absent from
    /// the result, which is not an error. An empty request resolves to an
    /// empty map without touching the cache or the engine. Rate-limit
    /// denial from the underlying execution propagates.
    pub async fn latest_batch(
        &self,
        serial: &str,
        names: &[String],
        kind: MetricKind,
        use_cache: bool,
    ) -> Result<BTreeMap<String, MetricReading>, ProxyError> {
        if names.is_empty() {
            return Ok(BTreeMap::new());
        }
        if serial.is_empty() {
            return Err(ProxyError::InvalidRequest("serial must not be empty".to_string()));
        }

        // The composite key is checked directly against the store rather
        // than through the executor, so the raw rows and the resolved map
        // are not cached redundantly.
        let key = cache::batch_key(kind.cache_prefix(), serial, names);
        if use_cache {
            if let Some(payload) = self.cache.get(&key).await {
                if let Ok(resolved) = serde_json::from_slice(&payload) {
                    metrics::record_cache_hit("batch");
                    debug!(serial, key_tail = cache::key_tail(&key), "batch cache hit");
                    return Ok(resolved);
                }
            }
            metrics::record_cache_miss("batch");
        }

        let query = build_latest_query(kind, serial, names);
        let rows = self.executor.run(&query, false, None).await?;

        let resolved = resolve_names(names, &rows, kind);
        info!(
            serial,
            matched = resolved.len(),
            requested = names.len(),
            "batch query resolved"
        );

        if use_cache {
            match serde_json::to_vec(&resolved) {
                Ok(payload) => {
                    self.cache.set(&key, payload, self.cache_config.default_ttl).await
                }
                Err(e) => warn!(error = %e, "failed to serialize batch result for caching"),
            }
        }

        Ok(resolved)
    }
}

/// Build one "latest value per name" query over all requested names: rows
/// for the device, name matching ANY requested name, reduced to the row
/// with the maximum local timestamp per name.
fn build_latest_query(kind: MetricKind, serial: &str, names: &[String]) -> String {
    let filters: Vec<String> = names
        .iter()
        .map(|name| format!("name {} '{}'", kind.name_operator(), name))
        .collect();

    format!(
        "{table}\n\
         | where comms_serial contains '{serial}'\n\
         | where {filters}\n\
         | summarize arg_max(localtime, {value}) by name\n\
         | project name, localtime, {value}",
        table = kind.table(),
        serial = serial,
        filters = filters.join(" or "),
        value = kind.value_column(),
    )
}

/// Map engine row names back onto the requested names.
///
/// Rows are indexed in engine row order. For each requested name, in the
/// caller's order, an exact match wins; otherwise the first row in engine
/// order whose name contains the requested name or is contained by it.
/// First match wins, which keeps resolution deterministic for a given
/// result set. This is a best-effort fuzzy join, not a guaranteed unique
/// match.
fn resolve_names(
    names: &[String],
    rows: &[Row],
    kind: MetricKind,
) -> BTreeMap<String, MetricReading> {
    let mut indexed: Vec<(&str, MetricReading)> = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(name) = row.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        indexed.push((
            name,
            MetricReading {
                value: row.get(kind.value_column()).cloned(),
                localtime: row.get("localtime").cloned(),
            },
        ));
    }

    let mut resolved = BTreeMap::new();
    for requested in names {
        let exact = indexed.iter().find(|(name, _)| *name == requested.as_str());
        let matched = exact.or_else(|| {
            indexed
                .iter()
                .find(|(name, _)| name.contains(requested.as_str()) || requested.contains(name))
        });

        if let Some((_, reading)) = matched {
            resolved.insert(requested.clone(), reading.clone());
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::client::{ClientError, EngineError, QueryEngine};
    use crate::limiter::{LimiterConfig, RateLimiter};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeEngine {
        rows: Vec<Row>,
        calls: AtomicUsize,
    }

    impl FakeEngine {
        fn returning(rows: Vec<Row>) -> Self {
            Self { rows, calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QueryEngine for FakeEngine {
        async fn execute(&self, _query: &str) -> Result<Vec<Row>, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.clone())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl QueryEngine for FailingEngine {
        async fn execute(&self, _query: &str) -> Result<Vec<Row>, EngineError> {
            Err(EngineError::Execution(ClientError::Auth("denied".to_string())))
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn row(name: &str, value: f64, localtime: &str) -> Row {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "localtime": localtime,
            "value_double": value,
        }))
        .unwrap()
    }

    fn resolver_with(
        engine: Arc<dyn QueryEngine>,
        max_requests: usize,
    ) -> (BatchResolver, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new(64));
        let executor = Arc::new(QueryExecutor::new(
            cache.clone(),
            Arc::new(RateLimiter::new(LimiterConfig {
                max_requests,
                window: Duration::from_secs(60),
            })),
            engine,
            CacheConfig::default(),
        ));
        (BatchResolver::new(executor, cache.clone(), CacheConfig::default()), cache)
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_telemetry_query_text() {
        let query = build_latest_query(
            MetricKind::Telemetry,
            "SN123",
            &names(&["battery_soc", "pv1_voltage"]),
        );
        assert_eq!(
            query,
            "Telemetry\n\
             | where comms_serial contains 'SN123'\n\
             | where name contains 'battery_soc' or name contains 'pv1_voltage'\n\
             | summarize arg_max(localtime, value_double) by name\n\
             | project name, localtime, value_double"
        );
    }

    #[test]
    fn test_alarm_query_text() {
        let query = build_latest_query(MetricKind::Alarm, "SN123", &names(&["grid_fault"]));
        assert_eq!(
            query,
            "Alarms\n\
             | where comms_serial contains 'SN123'\n\
             | where name has 'grid_fault'\n\
             | summarize arg_max(localtime, value) by name\n\
             | project name, localtime, value"
        );
    }

    #[test]
    fn test_resolution_exact_and_fuzzy() {
        let rows = vec![row("A", 1.0, "t1"), row("XB", 2.0, "t2")];
        let resolved = resolve_names(&names(&["A", "B", "C"]), &rows, MetricKind::Telemetry);

        assert_eq!(resolved["A"].value, Some(serde_json::json!(1.0)));
        // "B" is a substring of the engine-side "XB"
        assert_eq!(resolved["B"].value, Some(serde_json::json!(2.0)));
        // No match of either kind: absent, not an error
        assert!(!resolved.contains_key("C"));
    }

    #[test]
    fn test_resolution_prefers_exact_over_fuzzy() {
        let rows = vec![row("inverter_mode_x", 1.0, "t1"), row("inverter_mode", 2.0, "t2")];
        let resolved = resolve_names(&names(&["inverter_mode"]), &rows, MetricKind::Telemetry);
        assert_eq!(resolved["inverter_mode"].value, Some(serde_json::json!(2.0)));
    }

    #[test]
    fn test_fuzzy_first_match_in_engine_row_order() {
        let rows = vec![row("path/B", 1.0, "t1"), row("other/B", 2.0, "t2")];
        let resolved = resolve_names(&names(&["B"]), &rows, MetricKind::Telemetry);
        assert_eq!(resolved["B"].value, Some(serde_json::json!(1.0)));
    }

    #[test]
    fn test_resolution_matches_engine_name_inside_requested() {
        // The engine-side name may be shorter than the requested name
        let rows = vec![row("soc", 55.0, "t1")];
        let resolved = resolve_names(&names(&["battery_soc"]), &rows, MetricKind::Telemetry);
        assert_eq!(resolved["battery_soc"].value, Some(serde_json::json!(55.0)));
    }

    #[tokio::test]
    async fn test_empty_names_issues_no_query() {
        let engine = Arc::new(FakeEngine::returning(vec![]));
        let (resolver, cache) = resolver_with(engine.clone(), 10);

        let resolved = resolver
            .latest_batch("SN123", &[], MetricKind::Telemetry, true)
            .await
            .unwrap();

        assert!(resolved.is_empty());
        assert_eq!(engine.calls(), 0);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_empty_serial_is_invalid() {
        let engine = Arc::new(FakeEngine::returning(vec![]));
        let (resolver, _) = resolver_with(engine, 10);

        let result = resolver
            .latest_batch("", &names(&["a"]), MetricKind::Telemetry, true)
            .await;
        assert!(matches!(result, Err(ProxyError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_second_batch_within_ttl_hits_cache() {
        let engine = Arc::new(FakeEngine::returning(vec![row("battery_soc", 87.5, "t1")]));
        let (resolver, _) = resolver_with(engine.clone(), 10);
        let requested = names(&["battery_soc"]);

        let first = resolver
            .latest_batch("SN123", &requested, MetricKind::Telemetry, true)
            .await
            .unwrap();
        let second = resolver
            .latest_batch("SN123", &requested, MetricKind::Telemetry, true)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_batch_cache_key_ignores_name_order() {
        let engine = Arc::new(FakeEngine::returning(vec![row("a", 1.0, "t1"), row("b", 2.0, "t1")]));
        let (resolver, _) = resolver_with(engine.clone(), 10);

        resolver
            .latest_batch("SN123", &names(&["a", "b"]), MetricKind::Telemetry, true)
            .await
            .unwrap();
        resolver
            .latest_batch("SN123", &names(&["b", "a"]), MetricKind::Telemetry, true)
            .await
            .unwrap();

        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_denial_propagates() {
        let engine = Arc::new(FakeEngine::returning(vec![]));
        let (resolver, _) = resolver_with(engine, 0);

        let result = resolver
            .latest_batch("SN123", &names(&["a"]), MetricKind::Telemetry, false)
            .await;
        assert!(matches!(result, Err(ProxyError::RateLimited)));
    }

    #[tokio::test]
    async fn test_engine_failure_resolves_to_empty_map() {
        let (resolver, _) = resolver_with(Arc::new(FailingEngine), 10);

        let resolved = resolver
            .latest_batch("SN123", &names(&["a"]), MetricKind::Telemetry, false)
            .await
            .unwrap();
        assert!(resolved.is_empty());
    }
}
