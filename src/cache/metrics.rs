//! Counters for cache effectiveness.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters recording cache effectiveness.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Lookups served from the cache
    pub hits: AtomicU64,
    /// Lookups that fell through to the engine
    pub misses: AtomicU64,
    /// Entries written after fresh executions
    pub puts: AtomicU64,
}

impl CacheMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache put
    pub fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            puts: self.puts.load(Ordering::Relaxed),
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
        }
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that fell through to the engine
    pub misses: u64,
    /// Entries written after fresh executions
    pub puts: u64,
    /// Fraction of lookups served from the cache
    pub hit_rate: f64,
}
