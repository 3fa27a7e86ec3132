//! Backend selection
//!
//! A configured Redis host selects [`RedisCache`]; anything else, or a Redis
//! backend that cannot be set up, falls back to [`MemoryCache`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{Cache, MemoryCache, RedisCache};
use crate::config::Config;

/// Builds a cache from configuration without touching the network.
///
/// A Redis server that turns out to be unreachable is only noticed on first
/// use, and each operation then fails softly.
pub fn create_cache(config: &Config) -> Arc<dyn Cache> {
    if let Some(redis) = &config.redis {
        match RedisCache::new(redis, config.namespace.as_str()) {
            Ok(cache) => {
                info!("Using Redis cache at {}", cache.endpoint());
                return Arc::new(cache);
            }
            Err(e) => warn!(
                "Failed to initialize Redis cache: {}. Falling back to memory cache.",
                e
            ),
        }
    }

    memory_cache(config)
}

/// Builds a cache and, for Redis, verifies the server answers.
///
/// If the connection cannot be established the in-memory backend is used.
pub async fn connect_cache(config: &Config) -> Arc<dyn Cache> {
    if let Some(redis) = &config.redis {
        match RedisCache::new(redis, config.namespace.as_str()) {
            Ok(cache) => match cache.ping().await {
                Ok(()) => {
                    info!("Using Redis cache at {}", cache.endpoint());
                    return Arc::new(cache);
                }
                Err(e) => warn!(
                    "Redis at {} is unavailable: {}. Falling back to memory cache.",
                    cache.endpoint(),
                    e
                ),
            },
            Err(e) => warn!(
                "Failed to initialize Redis cache: {}. Falling back to memory cache.",
                e
            ),
        }
    }

    memory_cache(config)
}

fn memory_cache(config: &Config) -> Arc<dyn Cache> {
    info!("Using in-memory cache");
    Arc::new(MemoryCache::new(config.namespace.clone()))
}
