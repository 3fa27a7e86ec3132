//! Copilot Cache - TTL response cache for the Trading-Copilot
//!
//! Provides a best-effort string key-value cache with Redis and in-memory
//! backends, plus a small HTTP surface for inspecting it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{connect_cache, create_cache, Backend, Cache, CacheExt, MemoryCache, RedisCache};
pub use config::{Config, RedisConfig};
pub use error::CacheError;
