//! Redis backend
//!
//! The connection is opened lazily on first use and kept until `close`.
//! Only establishment is serialized; afterwards each operation works on its
//! own clone of the multiplexed connection manager.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    aio::ConnectionManager, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo,
    RedisResult, Script,
};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::cache::{
    absorb, namespaced, validate_key, validate_ttl, Backend, Cache, CacheStats, StatsRecorder,
};
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 200;

/// Keys removed per DEL command during a flush.
const DELETE_BATCH: usize = 500;

/// INCRBY that resets non-integer values to the increment instead of failing.
/// Overflow and wrong-type errors are passed back to the caller.
const INCREMENT_SCRIPT: &str = r#"
local result = redis.pcall('INCRBY', KEYS[1], ARGV[1])
if type(result) == 'table' and result.err then
    if string.find(result.err, 'not an integer', 1, true) then
        redis.call('SET', KEYS[1], ARGV[1], 'KEEPTTL')
        return tonumber(ARGV[1])
    end
end
return result
"#;

// == Redis Cache ==
/// Cache stored in a Redis database.
pub struct RedisCache {
    client: Client,
    namespace: String,
    timeout: Duration,
    connection: Mutex<Option<ConnectionManager>>,
    increment_script: Script,
    stats: StatsRecorder,
    endpoint: String,
}

impl RedisCache {
    // == Constructor ==
    /// Prepares a cache for the given server. No connection is made yet.
    pub fn new(config: &RedisConfig, namespace: impl Into<String>) -> Result<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.db,
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let client = Client::open(info)?;

        Ok(Self {
            client,
            namespace: namespace.into(),
            timeout: config.timeout,
            connection: Mutex::new(None),
            increment_script: Script::new(INCREMENT_SCRIPT),
            stats: StatsRecorder::new(),
            endpoint: format!("{}:{}/{}", config.host, config.port, config.db),
        })
    }

    /// Server address in `host:port/db` form, for logging.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns true if a connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Establishes the connection if needed and checks the server answers.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        self.bounded(redis::cmd("PING").query_async::<_, String>(&mut conn))
            .await?;
        Ok(())
    }

    fn key(&self, key: &str) -> String {
        namespaced(&self.namespace, key)
    }

    /// SCAN MATCH pattern for logical `pattern` inside this namespace.
    fn match_pattern(&self, pattern: &str) -> String {
        format!("{}{}", escape_glob(&self.namespace), pattern)
    }

    // == Connection Handling ==
    /// Returns the shared connection, opening it on first use.
    async fn connection(&self) -> Result<ConnectionManager> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        match self.connect().await {
            Ok(conn) => {
                info!("Connected to Redis at {}", self.endpoint);
                *slot = Some(conn.clone());
                Ok(conn)
            }
            Err(e) => {
                error!("Error connecting to Redis at {}: {}", self.endpoint, e);
                Err(e)
            }
        }
    }

    async fn connect(&self) -> Result<ConnectionManager> {
        let mut conn = self
            .bounded(ConnectionManager::new(self.client.clone()))
            .await
            .map_err(into_connection_error)?;
        self.bounded(redis::cmd("PING").query_async::<_, String>(&mut conn))
            .await
            .map_err(into_connection_error)?;
        Ok(conn)
    }

    /// Applies the configured timeout to a Redis future.
    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }

    /// Collects full (prefixed) keys matching `pattern` with SCAN.
    async fn scan(&self, conn: &mut ConnectionManager, pattern: &str) -> Result<Vec<String>> {
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = self
                .bounded(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(conn),
                )
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    // == Fallible Operations ==
    async fn try_get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let mut conn = self.connection().await?;
        let value: Option<String> = self
            .bounded(redis::cmd("GET").arg(self.key(key)).query_async(&mut conn))
            .await?;

        self.stats.record_lookup(value.is_some());
        Ok(value)
    }

    async fn try_set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<bool> {
        validate_key(key)?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(key)).arg(value);
        if let Some(seconds) = ttl {
            validate_ttl(seconds)?;
            cmd.arg("EX").arg(seconds);
        }

        let mut conn = self.connection().await?;
        self.bounded(cmd.query_async::<_, ()>(&mut conn)).await?;
        Ok(true)
    }

    async fn try_delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let mut conn = self.connection().await?;
        let removed: i64 = self
            .bounded(redis::cmd("DEL").arg(self.key(key)).query_async(&mut conn))
            .await?;
        Ok(removed > 0)
    }

    async fn try_exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let mut conn = self.connection().await?;
        let found: i64 = self
            .bounded(redis::cmd("EXISTS").arg(self.key(key)).query_async(&mut conn))
            .await?;
        Ok(found > 0)
    }

    async fn try_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let keys = self.scan(&mut conn, &self.match_pattern(pattern)).await?;

        Ok(keys
            .into_iter()
            .filter_map(|full_key| {
                full_key
                    .strip_prefix(self.namespace.as_str())
                    .map(str::to_string)
            })
            .collect())
    }

    async fn try_flush(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = self
            .scan(&mut conn, &self.match_pattern("*"))
            .await?
            .into_iter()
            .filter(|full_key| full_key.starts_with(self.namespace.as_str()))
            .collect();

        for chunk in keys.chunks(DELETE_BATCH) {
            self.bounded(redis::cmd("DEL").arg(chunk).query_async::<_, i64>(&mut conn))
                .await?;
        }
        debug!("Flushed {} keys from namespace '{}'", keys.len(), self.namespace);
        Ok(true)
    }

    async fn try_increment(&self, key: &str, amount: i64) -> Result<i64> {
        validate_key(key)?;
        let mut conn = self.connection().await?;
        self.bounded(
            self.increment_script
                .key(self.key(key))
                .arg(amount)
                .invoke_async::<_, i64>(&mut conn),
        )
        .await
    }

    async fn try_expire(&self, key: &str, seconds: u64) -> Result<bool> {
        validate_key(key)?;
        validate_ttl(seconds)?;
        let mut conn = self.connection().await?;
        let applied: i64 = self
            .bounded(
                redis::cmd("EXPIRE")
                    .arg(self.key(key))
                    .arg(seconds)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(applied == 1)
    }
}

fn into_connection_error(err: CacheError) -> CacheError {
    match err {
        CacheError::Backend(e) => CacheError::Connection(e.to_string()),
        other => other,
    }
}

// == Cache Implementation ==
impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("endpoint", &self.endpoint)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Escapes Redis glob metacharacters so `text` only matches itself.
fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl Cache for RedisCache {
    fn backend(&self) -> Backend {
        Backend::Redis
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    async fn get(&self, key: &str) -> Option<String> {
        let result = self.try_get(key).await;
        absorb(&self.stats, Backend::Redis, "get", result, None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> bool {
        let result = self.try_set(key, value, ttl).await;
        absorb(&self.stats, Backend::Redis, "set", result, false)
    }

    async fn delete(&self, key: &str) -> bool {
        let result = self.try_delete(key).await;
        absorb(&self.stats, Backend::Redis, "delete", result, false)
    }

    async fn exists(&self, key: &str) -> bool {
        let result = self.try_exists(key).await;
        absorb(&self.stats, Backend::Redis, "exists", result, false)
    }

    async fn keys(&self, pattern: &str) -> Vec<String> {
        let result = self.try_keys(pattern).await;
        absorb(&self.stats, Backend::Redis, "keys", result, Vec::new())
    }

    async fn flush(&self) -> bool {
        let result = self.try_flush().await;
        absorb(&self.stats, Backend::Redis, "flush", result, false)
    }

    async fn increment(&self, key: &str, amount: i64) -> Option<i64> {
        let result = self.try_increment(key, amount).await.map(Some);
        absorb(&self.stats, Backend::Redis, "increment", result, None)
    }

    async fn expire(&self, key: &str, seconds: u64) -> bool {
        let result = self.try_expire(key, seconds).await;
        absorb(&self.stats, Backend::Redis, "expire", result, false)
    }

    async fn close(&self) {
        let mut slot = self.connection.lock().await;
        if slot.take().is_some() {
            info!("Closed Redis connection to {}", self.endpoint);
        }
    }
}
