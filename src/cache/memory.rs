//! In-memory backend
//!
//! Fallback used when no Redis host is configured. Expiry is enforced lazily:
//! reads drop an expired entry before answering and `keys` sweeps the whole
//! store first. There is no background task.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use wildmatch::WildMatch;

use crate::cache::{
    absorb, namespaced, validate_key, validate_ttl, Backend, Cache, CacheStats, CacheStore,
    StatsRecorder,
};
use crate::error::{CacheError, Result};

/// Physical store that several namespaced caches may share.
pub type SharedStore = Arc<RwLock<CacheStore>>;

// == Memory Cache ==
/// Process-local cache backed by a [`CacheStore`].
#[derive(Debug)]
pub struct MemoryCache {
    store: SharedStore,
    namespace: String,
    stats: StatsRecorder,
}

impl MemoryCache {
    // == Constructors ==
    /// Creates a cache with its own private store.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_store(Arc::new(RwLock::new(CacheStore::new())), namespace)
    }

    /// Creates a cache over an existing store, e.g. one obtained from
    /// [`MemoryCache::store`] on another instance.
    pub fn with_store(store: SharedStore, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            stats: StatsRecorder::new(),
        }
    }

    /// Handle to the underlying store.
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    fn key(&self, key: &str) -> String {
        namespaced(&self.namespace, key)
    }

    /// Drops `full_key` if expired, counting it.
    fn sweep_one(&self, store: &mut CacheStore, full_key: &str) {
        if store.purge_if_expired(full_key) {
            self.stats.record_expired(1);
        }
    }

    // == Fallible Operations ==
    async fn try_get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let full_key = self.key(key);

        let mut store = self.store.write().await;
        self.sweep_one(&mut store, &full_key);
        let value = store.get(&full_key).map(str::to_string);

        self.stats.record_lookup(value.is_some());
        Ok(value)
    }

    async fn try_set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<bool> {
        validate_key(key)?;
        if let Some(seconds) = ttl {
            validate_ttl(seconds)?;
        }

        let mut store = self.store.write().await;
        store.set(self.key(key), value.to_string(), ttl);
        Ok(true)
    }

    async fn try_delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let full_key = self.key(key);

        let mut store = self.store.write().await;
        self.sweep_one(&mut store, &full_key);
        Ok(store.delete(&full_key))
    }

    async fn try_exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let full_key = self.key(key);

        let mut store = self.store.write().await;
        self.sweep_one(&mut store, &full_key);
        Ok(store.contains(&full_key))
    }

    async fn try_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = WildMatch::new(pattern);

        let mut store = self.store.write().await;
        let swept = store.purge_expired();
        self.stats.record_expired(swept);

        let mut keys: Vec<String> = store
            .keys_with_prefix(&self.namespace)
            .map(|full_key| &full_key[self.namespace.len()..])
            .filter(|key| matcher.matches(key))
            .map(str::to_string)
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn try_flush(&self) -> Result<bool> {
        let mut store = self.store.write().await;
        let removed = store.remove_prefixed(&self.namespace);
        debug!("Flushed {} keys from namespace '{}'", removed, self.namespace);
        Ok(true)
    }

    async fn try_increment(&self, key: &str, amount: i64) -> Result<i64> {
        validate_key(key)?;
        let full_key = self.key(key);

        let mut store = self.store.write().await;
        self.sweep_one(&mut store, &full_key);
        store.increment(&full_key, amount).ok_or_else(|| {
            CacheError::Conflict(format!("incrementing '{}' by {} overflows", key, amount))
        })
    }

    async fn try_expire(&self, key: &str, seconds: u64) -> Result<bool> {
        validate_key(key)?;
        validate_ttl(seconds)?;
        let full_key = self.key(key);

        let mut store = self.store.write().await;
        self.sweep_one(&mut store, &full_key);
        Ok(store.expire(&full_key, seconds))
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_NAMESPACE)
    }
}

// == Cache Implementation ==
#[async_trait]
impl Cache for MemoryCache {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    async fn get(&self, key: &str) -> Option<String> {
        let result = self.try_get(key).await;
        absorb(&self.stats, Backend::Memory, "get", result, None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> bool {
        let result = self.try_set(key, value, ttl).await;
        absorb(&self.stats, Backend::Memory, "set", result, false)
    }

    async fn delete(&self, key: &str) -> bool {
        let result = self.try_delete(key).await;
        absorb(&self.stats, Backend::Memory, "delete", result, false)
    }

    async fn exists(&self, key: &str) -> bool {
        let result = self.try_exists(key).await;
        absorb(&self.stats, Backend::Memory, "exists", result, false)
    }

    async fn keys(&self, pattern: &str) -> Vec<String> {
        let result = self.try_keys(pattern).await;
        absorb(&self.stats, Backend::Memory, "keys", result, Vec::new())
    }

    async fn flush(&self) -> bool {
        let result = self.try_flush().await;
        absorb(&self.stats, Backend::Memory, "flush", result, false)
    }

    async fn increment(&self, key: &str, amount: i64) -> Option<i64> {
        let result = self.try_increment(key, amount).await.map(Some);
        absorb(&self.stats, Backend::Memory, "increment", result, None)
    }

    async fn expire(&self, key: &str, seconds: u64) -> bool {
        let result = self.try_expire(key, seconds).await;
        absorb(&self.stats, Backend::Memory, "expire", result, false)
    }

    async fn close(&self) {
        debug!("Closing in-memory cache (no-op)");
    }
}
