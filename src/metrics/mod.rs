//! Metrics for the ADX proxy.

mod prometheus;

pub use prometheus::{
    encode_metrics, observe_query_duration, record_cache_hit, record_cache_miss, record_query,
    record_rate_limited, register_metrics, set_client_available, REGISTRY,
};
