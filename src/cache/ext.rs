//! Typed JSON helpers
//!
//! Available on every [`Cache`], including `dyn Cache`.

use std::future::Future;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::cache::Cache;

#[async_trait]
pub trait CacheExt: Cache {
    /// Serializes `data` to JSON and stores it.
    async fn store_as<T>(&self, key: &str, data: &T, ttl: Option<u64>) -> bool
    where
        T: Serialize + Sync + ?Sized;

    /// Reads and decodes a JSON value. Missing or undecodable values are None.
    async fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Send;

    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// Errors from `compute` are returned unchanged and nothing is stored.
    async fn remember_json<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<u64>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send;
}

#[async_trait]
impl<C: Cache + ?Sized> CacheExt for C {
    async fn store_as<T>(&self, key: &str, data: &T, ttl: Option<u64>) -> bool
    where
        T: Serialize + Sync + ?Sized,
    {
        match serde_json::to_string(data) {
            Ok(encoded) => self.set(key, &encoded, ttl).await,
            Err(e) => {
                warn!("Error serializing '{}' for {} cache: {}", key, self.backend(), e);
                false
            }
        }
    }

    async fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Error decoding '{}' from {} cache: {}", key, self.backend(), e);
                None
            }
        }
    }

    async fn remember_json<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<u64>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        E: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if let Some(cached) = self.get_as::<T>(key).await {
            debug!("Cache hit for '{}'", key);
            return Ok(cached);
        }

        let value = compute().await?;
        if !self.store_as(key, &value, ttl).await {
            debug!("Computed value for '{}' was not cached", key);
        }
        Ok(value)
    }
}
