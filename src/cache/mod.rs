//! Query result caching.
//!
//! A shared, TTL-aware key-value store sits between the proxy and the
//! billed query engine. Two lookups use it: the single-query executor
//! caches raw row lists under a key derived from the query text, and the
//! batch resolver caches resolved name-to-reading maps under a composite
//! key. Staleness up to the TTL is acceptable by design.
//!
//! The backend is pluggable through [`CacheStore`]; the in-process
//! [`MemoryCache`] is the default, and a networked store only needs to
//! implement the same two operations.

mod config;
mod key;
mod memory;
mod metrics;

pub use config::CacheConfig;
pub use key::{batch_key, key_tail, query_key};
pub use memory::MemoryCache;
pub use metrics::{CacheMetrics, CacheStats};

use async_trait::async_trait;
use std::time::Duration;

/// TTL-aware key-value store shared by the executor and the batch resolver.
///
/// A miss is a normal outcome signaled by `None`, never an error. Entries
/// older than their TTL become unobservable to `get`; exact eviction timing
/// (lazy-on-read or active sweep) is backend-defined. Implementations must
/// be safe for concurrent access.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the payload stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `payload` under `key` for `ttl`, overwriting any prior entry.
    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration);
}
