//! Cache Store Module
//!
//! Physical key-value map behind the in-memory backend. Keys here are already
//! namespaced; the store knows nothing about prefixes beyond bulk removal.

use std::collections::HashMap;
use std::time::Instant;

use crate::cache::CacheEntry;

// == Cache Store ==
/// HashMap storage with lazily enforced TTL.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
}

impl CacheStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Stores a value, replacing any previous value and TTL.
    pub fn set(&mut self, key: String, value: String, ttl: Option<u64>) {
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    // == Get ==
    /// Returns the value stored under `key`.
    ///
    /// Callers are expected to run `purge_if_expired` first.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|entry| entry.value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Delete ==
    /// Removes an entry, returning whether one was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Increment ==
    /// Adds `amount` to the integer stored under `key`.
    ///
    /// A missing key starts from zero. A non-numeric value is replaced by
    /// `amount`. The entry keeps its TTL. Returns None on overflow, leaving
    /// the value untouched.
    pub fn increment(&mut self, key: &str, amount: i64) -> Option<i64> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                let next = match entry.value.trim().parse::<i64>() {
                    Ok(current) => current.checked_add(amount)?,
                    Err(_) => amount,
                };
                entry.value = next.to_string();
                Some(next)
            }
            None => {
                self.set(key.to_string(), amount.to_string(), None);
                Some(amount)
            }
        }
    }

    // == Expire ==
    /// Applies a TTL to an existing entry.
    pub fn expire(&mut self, key: &str, ttl_seconds: u64) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expire_in(ttl_seconds);
                true
            }
            None => false,
        }
    }

    // == Lazy Expiry ==
    /// Drops `key` if its TTL has elapsed. Returns true if it was dropped.
    pub fn purge_if_expired(&mut self, key: &str) -> bool {
        let expired = self
            .entries
            .get(key)
            .map(CacheEntry::is_expired)
            .unwrap_or(false);
        if expired {
            self.entries.remove(key);
        }
        expired
    }

    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    // == Namespace Helpers ==
    /// Iterates over stored keys that start with `prefix`.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .keys()
            .filter(move |key| key.starts_with(prefix))
            .map(String::as_str)
    }

    /// Removes every key that starts with `prefix`, returning how many went.
    pub fn remove_prefixed(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before - self.entries.len()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new();

        store.set("ns:key1".to_string(), "value1".to_string(), None);

        assert_eq!(store.get("ns:key1"), Some("value1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = CacheStore::new();
        assert!(store.get("nonexistent").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_delete() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), "value1".to_string(), None);
        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_overwrite_resets_ttl() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), "value1".to_string(), Some(1));
        store.set("key1".to_string(), "value2".to_string(), None);

        sleep(Duration::from_millis(1100));

        assert!(!store.purge_if_expired("key1"));
        assert_eq!(store.get("key1"), Some("value2"));
    }

    #[test]
    fn test_store_purge_if_expired() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), "value1".to_string(), Some(1));
        assert!(!store.purge_if_expired("key1"));

        sleep(Duration::from_millis(1100));

        assert!(store.purge_if_expired("key1"));
        assert!(!store.contains("key1"));
        assert!(!store.purge_if_expired("key1"));
    }

    #[test]
    fn test_store_purge_expired() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), "value1".to_string(), Some(1));
        store.set("key2".to_string(), "value2".to_string(), Some(10));
        store.set("key3".to_string(), "value3".to_string(), None);

        sleep(Duration::from_millis(1100));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("key2"), Some("value2"));
    }

    #[test]
    fn test_store_increment() {
        let mut store = CacheStore::new();

        assert_eq!(store.increment("hits", 5), Some(5));
        assert_eq!(store.increment("hits", 3), Some(8));
        assert_eq!(store.increment("hits", -10), Some(-2));
        assert_eq!(store.get("hits"), Some("-2"));
    }

    #[test]
    fn test_store_increment_non_numeric_resets() {
        let mut store = CacheStore::new();

        store.set("label".to_string(), "BTC/USDT".to_string(), None);
        assert_eq!(store.increment("label", 4), Some(4));
        assert_eq!(store.get("label"), Some("4"));
    }

    #[test]
    fn test_store_increment_overflow() {
        let mut store = CacheStore::new();

        store.set("big".to_string(), i64::MAX.to_string(), None);
        assert_eq!(store.increment("big", 1), None);
        assert_eq!(store.get("big"), Some(i64::MAX.to_string().as_str()));
    }

    #[test]
    fn test_store_increment_keeps_ttl() {
        let mut store = CacheStore::new();

        store.set("count".to_string(), "1".to_string(), Some(1));
        store.increment("count", 1);

        sleep(Duration::from_millis(1100));

        assert!(store.purge_if_expired("count"));
    }

    #[test]
    fn test_store_expire() {
        let mut store = CacheStore::new();

        assert!(!store.expire("missing", 10));

        store.set("key".to_string(), "value".to_string(), None);
        assert!(store.expire("key", 1));

        sleep(Duration::from_millis(1100));

        assert!(store.purge_if_expired("key"));
    }

    #[test]
    fn test_store_prefix_helpers() {
        let mut store = CacheStore::new();

        store.set("a:one".to_string(), "1".to_string(), None);
        store.set("a:two".to_string(), "2".to_string(), None);
        store.set("b:one".to_string(), "1".to_string(), None);

        let mut keys: Vec<&str> = store.keys_with_prefix("a:").collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a:one", "a:two"]);

        assert_eq!(store.remove_prefixed("a:"), 2);
        assert_eq!(store.len(), 1);
        assert!(store.contains("b:one"));
    }
}
