//! Cache Entry Module
//!
//! Defines the structure for individual in-memory entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single in-memory value with an optional expiry instant.
///
/// Expiry is measured on the monotonic clock, so an expired entry can never
/// become readable again because of wall-clock adjustments.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - Optional TTL in seconds
    pub fn new(value: String, ttl_seconds: Option<u64>) -> Self {
        Self {
            value,
            expires_at: ttl_seconds.and_then(deadline_after),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current instant is greater than or equal
    /// to its expiration instant.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks expiry against a caller supplied instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Expire ==
    /// Replaces the expiry with one `ttl_seconds` from now.
    pub fn expire_in(&mut self, ttl_seconds: u64) {
        self.expires_at = deadline_after(ttl_seconds);
    }
}

/// None when the deadline lies beyond what the clock can represent.
fn deadline_after(ttl_seconds: u64) -> Option<Instant> {
    Instant::now().checked_add(Duration::from_secs(ttl_seconds))
}
