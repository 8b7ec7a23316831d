//! Configuration for the query result cache.

use std::time::Duration;

/// Configuration for the query result cache.
///
/// Two TTL classes exist: the short default for live telemetry and a longer
/// "historical" class for queries whose results are less time-sensitive.
/// The caller selects which applies.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for live telemetry results
    pub default_ttl: Duration,

    /// TTL for historical, less time-sensitive results
    pub historical_ttl: Duration,

    /// Maximum number of entries held by the in-process backend
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(30),
            historical_ttl: Duration::from_secs(300), // 5 minutes
            capacity: 1024,
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ADX_CACHE_TTL") {
            if let Ok(n) = val.parse() {
                config.default_ttl = Duration::from_secs(n);
            }
        }

        if let Ok(val) = std::env::var("ADX_CACHE_TTL_HISTORICAL") {
            if let Ok(n) = val.parse() {
                config.historical_ttl = Duration::from_secs(n);
            }
        }

        if let Ok(val) = std::env::var("ADX_CACHE_CAPACITY") {
            if let Ok(n) = val.parse() {
                config.capacity = n;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(30));
        assert_eq!(config.historical_ttl, Duration::from_secs(300));
        assert_eq!(config.capacity, 1024);
    }
}
