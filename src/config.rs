//! Configuration Module
//!
//! Loads cache and server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default key namespace shared by all copilot caches.
pub const DEFAULT_NAMESPACE: &str = "trading_copilot:";

/// Default Redis port.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Default bound on connection establishment and on each Redis request.
pub const DEFAULT_REDIS_TIMEOUT_SECS: u64 = 5;

/// Connection parameters for the Redis backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    /// Logical database index
    pub db: i64,
    pub password: Option<String>,
    /// Applied to connecting and to every command
    pub timeout: Duration,
}

impl RedisConfig {
    /// Creates a config for `host` with default port, database and timeout.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_REDIS_PORT,
            db: 0,
            password: None,
            timeout: Duration::from_secs(DEFAULT_REDIS_TIMEOUT_SECS),
        }
    }
}

/// Cache configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Redis settings; `None` selects the in-memory backend
    pub redis: Option<RedisConfig>,
    /// Prefix applied to every key
    pub namespace: String,
    /// HTTP inspection server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` - Redis host; empty or unset selects the in-memory cache
    /// - `REDIS_PORT` - Redis port (default: 6379)
    /// - `REDIS_DB` - Logical database index (default: 0)
    /// - `REDIS_PASSWORD` - Password, empty means none
    /// - `REDIS_PREFIX` - Key namespace (default: `trading_copilot:`)
    /// - `REDIS_TIMEOUT` - Connect/request timeout in seconds (default: 5)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let redis = lookup("REDIS_HOST")
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .map(|host| RedisConfig {
                host,
                port: parse_var(&lookup, "REDIS_PORT").unwrap_or(DEFAULT_REDIS_PORT),
                db: parse_var(&lookup, "REDIS_DB").unwrap_or(0),
                password: lookup("REDIS_PASSWORD").filter(|p| !p.is_empty()),
                timeout: Duration::from_secs(
                    parse_var(&lookup, "REDIS_TIMEOUT")
                        .filter(|secs: &u64| *secs > 0)
                        .unwrap_or(DEFAULT_REDIS_TIMEOUT_SECS),
                ),
            });

        Self {
            redis,
            namespace: lookup("REDIS_PREFIX").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            server_port: parse_var(&lookup, "SERVER_PORT").unwrap_or(3000),
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            server_port: 3000,
        }
    }
}
