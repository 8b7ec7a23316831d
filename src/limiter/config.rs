//! Configuration for the rate limiter.

use std::time::Duration;

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Maximum queries admitted per trailing window
    pub max_requests: usize,

    /// Length of the trailing window
    pub window: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

impl LimiterConfig {
    /// Create config from environment variables. The window length is
    /// fixed; only the admission ceiling is tunable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ADX_MAX_QUERIES_PER_MINUTE") {
            if let Ok(n) = val.parse() {
                config.max_requests = n;
            }
        }

        config
    }
}
