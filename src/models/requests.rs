//! Request DTOs for the cache inspection API
//!
//! Defines the structure of incoming HTTP request bodies and queries.

use serde::Deserialize;

use crate::cache::MAX_TTL_SECS;

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.ttl == Some(0) {
            return Some("TTL must be a positive number of seconds".to_string());
        }
        if self.ttl.is_some_and(|ttl| ttl > MAX_TTL_SECS) {
            return Some(format!("TTL must not exceed {} seconds", MAX_TTL_SECS));
        }
        None
    }
}

/// Request body for POST /incr/:key
#[derive(Debug, Clone, Deserialize)]
pub struct IncrementRequest {
    #[serde(default = "default_increment")]
    pub amount: i64,
}

fn default_increment() -> i64 {
    1
}

impl Default for IncrementRequest {
    fn default() -> Self {
        Self {
            amount: default_increment(),
        }
    }
}

/// Request body for POST /expire/:key
#[derive(Debug, Clone, Deserialize)]
pub struct ExpireRequest {
    pub seconds: u64,
}

/// Query string for GET /keys
#[derive(Debug, Clone, Deserialize)]
pub struct KeysQuery {
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_pattern() -> String {
    "*".to_string()
}
