//! Prometheus metrics for the ADX proxy.
//!
//! Exposes metrics in Prometheus format for monitoring and observability.
//! Execution failures are deliberately absorbed into empty results at the
//! HTTP boundary, so these counters are the place where "no data" and
//! "engine failed" stay distinguishable.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry for proxy metrics
    pub static ref REGISTRY: Registry = Registry::new();

    /// Outbound queries by outcome (success, error, unavailable)
    pub static ref QUERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("queries_total", "Total queries submitted to the engine")
            .namespace("adx_proxy"),
        &["status"]
    ).expect("metric can be created");

    /// Engine query duration
    pub static ref QUERY_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "query_duration_seconds",
            "Engine query duration in seconds"
        )
        .namespace("adx_proxy")
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).expect("metric can be created");

    /// Admissions denied by the rate limiter
    pub static ref RATE_LIMITED_TOTAL: Counter = Counter::with_opts(
        Opts::new("rate_limited_total", "Admissions denied by the rate limiter")
            .namespace("adx_proxy")
    ).expect("metric can be created");

    /// Cache hits by lookup kind (query, batch)
    pub static ref CACHE_HITS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("cache_hits_total", "Total cache hits")
            .namespace("adx_proxy"),
        &["kind"]
    ).expect("metric can be created");

    /// Cache misses by lookup kind (query, batch)
    pub static ref CACHE_MISSES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("cache_misses_total", "Total cache misses")
            .namespace("adx_proxy"),
        &["kind"]
    ).expect("metric can be created");

    /// Query client availability (1 = handle constructed, 0 = degraded)
    pub static ref CLIENT_AVAILABLE: Gauge = Gauge::with_opts(
        Opts::new("client_available", "Query client availability (1=available, 0=degraded)")
            .namespace("adx_proxy")
    ).expect("metric can be created");
}

/// Register all metrics with the global registry.
/// Should be called once at startup.
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(QUERIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUERY_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(RATE_LIMITED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_HITS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_MISSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CLIENT_AVAILABLE.clone()))?;
    Ok(())
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# Error encoding metrics: {}", e))
}

/// Record the outcome of a query submitted to the engine.
pub fn record_query(status: &str) {
    QUERIES_TOTAL.with_label_values(&[status]).inc();
}

/// Record how long an engine call took.
pub fn observe_query_duration(secs: f64) {
    QUERY_DURATION_SECONDS.observe(secs);
}

/// Record an admission denied by the rate limiter.
pub fn record_rate_limited() {
    RATE_LIMITED_TOTAL.inc();
}

/// Record a cache hit.
pub fn record_cache_hit(kind: &str) {
    CACHE_HITS_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a cache miss.
pub fn record_cache_miss(kind: &str) {
    CACHE_MISSES_TOTAL.with_label_values(&[kind]).inc();
}

/// Set query client availability.
pub fn set_client_available(available: bool) {
    CLIENT_AVAILABLE.set(if available { 1.0 } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        let registry = Registry::new();
        let counter = Counter::new("test_counter", "Test counter").unwrap();
        registry.register(Box::new(counter.clone())).unwrap();

        counter.inc();
        assert_eq!(counter.get(), 1.0);
    }

    #[test]
    fn test_record_helpers() {
        record_query("success");
        record_rate_limited();
        record_cache_hit("query");
        record_cache_miss("batch");
        set_client_available(true);
        // Recording must not panic even before registration
    }

    #[test]
    fn test_encode_metrics() {
        let output = encode_metrics();
        assert!(output.is_empty() || output.starts_with('#') || output.contains("adx_proxy"));
    }
}
