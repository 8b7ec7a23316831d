//! Cache key derivation.
//!
//! Keys are a pure function of their inputs: the query bytes for single
//! queries, the serial plus the sorted requested names for batch lookups.
//! Identical inputs always derive the identical key. The md5-based scheme
//! is reproducible bit-for-bit so entries written by earlier deployments
//! stay addressable during migration.

use md5::{Digest, Md5};

/// Derive the cache key for one query string.
pub fn query_key(query: &str) -> String {
    format!("adx:{}", hex::encode(Md5::digest(query.as_bytes())))
}

/// Derive the composite cache key for a batch lookup.
///
/// The requested names are sorted before hashing so the key is independent
/// of caller-supplied order.
pub fn batch_key(prefix: &str, serial: &str, names: &[String]) -> String {
    let mut sorted: Vec<&str> = names.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let digest = Md5::digest(sorted.join(":").as_bytes());
    format!("{}:{}:{}", prefix, serial, hex::encode(digest))
}

/// Last few characters of a key, for log lines that should not carry the
/// full key.
pub fn key_tail(key: &str) -> &str {
    &key[key.len().saturating_sub(8)..]
}
