//! Cache Module
//!
//! String key-value cache with TTL support. Two interchangeable backends sit
//! behind the [`Cache`] trait: [`RedisCache`] for a networked store and
//! [`MemoryCache`] as the in-process fallback. Use [`create_cache`] or
//! [`connect_cache`] to pick one from [`Config`](crate::Config).

mod entry;
mod ext;
mod factory;
mod memory;
mod redis_cache;
mod stats;
mod store;


use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{CacheError, Result};

// Re-export public types
pub use entry::CacheEntry;
pub use ext::CacheExt;
pub use factory::{connect_cache, create_cache};
pub use memory::{MemoryCache, SharedStore};
pub use redis_cache::RedisCache;
pub use stats::{CacheStats, StatsRecorder};
pub use store::CacheStore;

// == Backend ==
/// Which storage mechanism a cache instance is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Redis,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Memory => f.write_str("memory"),
            Backend::Redis => f.write_str("redis"),
        }
    }
}

// == Cache Trait ==
/// Backend-agnostic string key-value store with optional TTL.
///
/// Every operation is best effort: backend failures are logged and turned
/// into an absent value, `false` or an empty list. Callers must tolerate
/// spurious misses. Keys are namespaced transparently.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Storage mechanism behind this instance.
    fn backend(&self) -> Backend;

    /// Prefix applied to every key.
    fn namespace(&self) -> &str;

    /// Snapshot of this instance's counters.
    fn stats(&self) -> CacheStats;

    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, expiring after `ttl` seconds if given.
    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> bool;

    /// Removes `key`. Returns true if something was removed.
    async fn delete(&self, key: &str) -> bool;

    /// Returns true if `key` holds a live value.
    async fn exists(&self, key: &str) -> bool;

    /// Lists logical keys matching a glob `pattern` (`*`, `?`).
    async fn keys(&self, pattern: &str) -> Vec<String>;

    /// Removes every key in this namespace.
    async fn flush(&self) -> bool;

    /// Adds `amount` to the integer under `key` and returns the new value.
    ///
    /// A missing key counts from zero. A non-numeric value is reset to
    /// `amount`. Overflow returns None.
    async fn increment(&self, key: &str, amount: i64) -> Option<i64>;

    /// Sets a TTL on an existing key. Returns false if the key is absent.
    async fn expire(&self, key: &str, seconds: u64) -> bool;

    /// Releases any held connection. Safe to call more than once.
    async fn close(&self);

    /// Stores a JSON value encoded as a string.
    async fn store_json(&self, key: &str, data: &Value, ttl: Option<u64>) -> bool {
        match serde_json::to_string(data) {
            Ok(encoded) => self.set(key, &encoded, ttl).await,
            Err(e) => {
                warn!("Error storing JSON in {} cache: {}", self.backend(), e);
                false
            }
        }
    }

    /// Reads a value stored by `store_json`. Malformed text is a miss.
    async fn get_json(&self, key: &str) -> Option<Value> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Error getting JSON from {} cache for '{}': {}", self.backend(), key, e);
                None
            }
        }
    }
}

// == Shared Helpers ==
/// Joins namespace and logical key.
pub(crate) fn namespaced(namespace: &str, key: &str) -> String {
    format!("{}{}", namespace, key)
}

pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    Ok(())
}

/// Longest accepted TTL. Redis rejects anything above a signed 64-bit count.
pub(crate) const MAX_TTL_SECS: u64 = i64::MAX as u64;

pub(crate) fn validate_ttl(seconds: u64) -> Result<()> {
    if seconds == 0 {
        return Err(CacheError::InvalidRequest(
            "TTL must be a positive number of seconds".to_string(),
        ));
    }
    if seconds > MAX_TTL_SECS {
        return Err(CacheError::InvalidRequest(format!(
            "TTL must not exceed {} seconds",
            MAX_TTL_SECS
        )));
    }
    Ok(())
}

/// Turns a failed operation into its designated fallback value.
pub(crate) fn absorb<T>(
    stats: &StatsRecorder,
    backend: Backend,
    operation: &str,
    result: Result<T>,
    fallback: T,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            stats.record_error();
            warn!("Error during {} on {} cache: {}", operation, backend, e);
            fallback
        }
    }
}
