//! Response DTOs for the cache inspection API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{Backend, CacheStats};

/// Response body for GET /get/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Confirmation body shared by set, delete and expire
#[derive(Debug, Clone, Serialize)]
pub struct KeyResponse {
    /// Success message
    pub message: String,
    /// The key that was affected
    pub key: String,
}

impl KeyResponse {
    pub fn set(key: impl Into<String>) -> Self {
        Self::with_action(key, "set")
    }

    pub fn deleted(key: impl Into<String>) -> Self {
        Self::with_action(key, "deleted")
    }

    pub fn expiring(key: impl Into<String>, seconds: u64) -> Self {
        Self::with_action(key, &format!("set to expire in {}s", seconds))
    }

    fn with_action(key: impl Into<String>, action: &str) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' {} successfully", key, action),
            key,
        }
    }
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub pattern: String,
    pub keys: Vec<String>,
}

/// Response body for POST /incr/:key
#[derive(Debug, Clone, Serialize)]
pub struct CounterResponse {
    pub key: String,
    pub value: i64,
}

/// Response body for DELETE /flush
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    pub message: String,
    pub namespace: String,
}

impl FlushResponse {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            message: format!("Namespace '{}' flushed", namespace),
            namespace,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub backend: Backend,
    pub namespace: String,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped by lazy expiry
    pub expired: u64,
    /// Operations whose failure was absorbed
    pub errors: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(backend: Backend, namespace: impl Into<String>, stats: &CacheStats) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
            errors: stats.errors,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Active backend
    pub backend: Backend,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(backend: Backend) -> Self {
        Self {
            status: "healthy".to_string(),
            backend,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
