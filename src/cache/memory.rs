//! In-process cache backend using LRU eviction and TTL expiration.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::CacheStore;

/// A stored payload with its expiry deadline.
struct CachedEntry {
    payload: Vec<u8>,
    expires_at: Instant,
}

impl CachedEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process [`CacheStore`] backend.
///
/// Expired entries are dropped lazily on read; LRU eviction bounds memory
/// when the store is full.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, CachedEntry>>,
}

impl MemoryCache {
    /// Create a store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }

    /// Current number of entries, including any not yet lazily expired.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.payload.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) {
        let entry = CachedEntry { payload, expires_at: Instant::now() + ttl };
        self.entries.lock().await.put(key.to_string(), entry);
    }
}
