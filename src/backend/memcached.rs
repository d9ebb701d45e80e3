//! Memcached cache backend.
//!
//! Wraps the memcached ASCII protocol behind the uniform backend contract
//! via an async connection pool. TTLs pass straight through to the store's
//! native expiry. Counters delegate to the native `incr`/`decr` commands,
//! which are atomic under concurrent callers (including callers in other
//! processes) but carry two protocol quirks that are preserved here
//! rather than papered over:
//!
//! - `decr` clamps at zero; a decrement below zero stores 0.
//! - both commands fail on keys that do not exist.
//!
//! Memcached has no key-enumeration primitive, so `query_keys` always
//! returns an empty list. This is a documented backend limitation, not an
//! error.

use super::CacheBackend;
use crate::error::{Error, Result};
use crate::key::KeySpace;
use async_memcached::AsciiProtocol;
use deadpool_memcached::{Manager, Pool};
use std::time::Duration;

/// Default Memcached connection pool size.
/// Formula: (CPU cores × 2) + 1
/// For 8-core systems: 16 connections is optimal
/// Override with MEMCACHED_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: u32 = 16;

/// Configuration for the Memcached backend.
#[derive(Clone, Debug)]
pub struct MemcachedConfig {
    pub servers: Vec<String>, // e.g., ["localhost:11211", "cache2:11211"]
    pub connection_timeout: Duration,
    pub pool_size: u32,
    /// Namespace prefix prepended to every key.
    pub prefix: String,
}

impl Default for MemcachedConfig {
    fn default() -> Self {
        MemcachedConfig {
            servers: vec!["localhost:11211".to_string()],
            connection_timeout: Duration::from_secs(5),
            pool_size: DEFAULT_POOL_SIZE,
            prefix: String::new(),
        }
    }
}

/// Memcached backend with connection pooling and async operations.
///
/// # Example
///
/// ```no_run
/// # use cachefront::backend::{MemcachedBackend, MemcachedConfig, CacheBackend};
/// # use cachefront::error::Result;
/// # async fn example() -> Result<()> {
/// let config = MemcachedConfig {
///     servers: vec!["localhost:11211".to_string()],
///     ..Default::default()
/// };
///
/// let backend = MemcachedBackend::new(config).await?;
/// backend.set("key", b"value".to_vec(), None).await?;
/// let value = backend.get("key").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MemcachedBackend {
    pool: Pool,
    keyspace: KeySpace,
}

impl MemcachedBackend {
    /// Create new Memcached backend from configuration.
    ///
    /// # Errors
    /// Returns `Err` if connection pool creation fails
    pub async fn new(config: MemcachedConfig) -> Result<Self> {
        // deadpool-memcached Manager takes a single server address
        let addr = config
            .servers
            .first()
            .ok_or_else(|| Error::ConfigError("No memcached servers specified".to_string()))?
            .clone();

        let manager = Manager::new(addr.clone());

        let pool = Pool::builder(manager)
            .max_size(config.pool_size as usize)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to create connection pool: {}", e)))?;

        info!(
            "✓ Memcached backend initialized with server: {} (pool size: {})",
            addr, config.pool_size
        );

        Ok(MemcachedBackend {
            pool,
            keyspace: KeySpace::new(config.prefix),
        })
    }

    /// Create from server address directly.
    ///
    /// Pool size is determined by:
    /// 1. `MEMCACHED_POOL_SIZE` environment variable (if set)
    /// 2. `DEFAULT_POOL_SIZE` constant (16)
    ///
    /// # Errors
    /// Returns `Err` if connection pool creation fails
    pub async fn from_server(addr: String) -> Result<Self> {
        let pool_size = std::env::var("MEMCACHED_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        let config = MemcachedConfig {
            servers: vec![addr],
            pool_size,
            ..Default::default()
        };
        Self::new(config).await
    }
}

impl CacheBackend for MemcachedBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full = self.keyspace.namespaced(key);
        let mut conn = self.pool.get().await.map_err(|e| {
            Error::BackendError(format!("Failed to get Memcached connection: {}", e))
        })?;

        match conn.get(&full).await {
            Ok(Some(value)) => {
                debug!("✓ Memcached GET {} -> HIT", key);
                Ok(value.data)
            }
            Ok(None) => {
                debug!("✓ Memcached GET {} -> MISS", key);
                Ok(None)
            }
            Err(e) => Err(Error::BackendError(format!(
                "Memcached GET failed for key {}: {}",
                key, e
            ))),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let full = self.keyspace.namespaced(key);
        let mut conn = self.pool.get().await.map_err(|e| {
            Error::BackendError(format!("Failed to get Memcached connection: {}", e))
        })?;

        // Values < 2592000 (30 days) are interpreted as seconds from now.
        // None = item never expires (but may still be evicted when full).
        let expiration = ttl.map(|d| d.as_secs() as i64);

        conn.set(&full, value.as_slice(), expiration, None)
            .await
            .map_err(|e| {
                Error::BackendError(format!("Memcached SET failed for key {}: {}", key, e))
            })?;

        if let Some(d) = ttl {
            debug!("✓ Memcached SET {} (TTL: {:?})", key, d);
        } else {
            debug!("✓ Memcached SET {}", key);
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let full = self.keyspace.namespaced(key);
        let mut conn = self.pool.get().await.map_err(|e| {
            Error::BackendError(format!("Failed to get Memcached connection: {}", e))
        })?;

        match conn.delete(&full).await {
            Ok(()) => {
                debug!("✓ Memcached DELETE {}", key);
                Ok(true)
            }
            Err(e) if e.to_string().to_lowercase().contains("not found") => Ok(false),
            Err(e) => Err(Error::BackendError(format!(
                "Memcached DELETE failed for key {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        // Memcached doesn't have native EXISTS, use get to check
        Ok(self.get(key).await?.is_some())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let full = self.keyspace.namespaced(key);
        let mut conn = self.pool.get().await.map_err(|e| {
            Error::BackendError(format!("Failed to get Memcached connection: {}", e))
        })?;

        // incr/decr are unsigned on the wire; a negative delta flips the
        // command.
        let result = if delta >= 0 {
            conn.increment(&full, delta as u64).await
        } else {
            conn.decrement(&full, delta.unsigned_abs()).await
        };

        let value = result.map_err(|e| {
            Error::BackendError(format!("Memcached INCR failed for key {}: {}", key, e))
        })?;

        debug!("✓ Memcached INCR {} by {} -> {}", key, delta, value);
        Ok(value as i64)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        let full = self.keyspace.namespaced(key);
        let mut conn = self.pool.get().await.map_err(|e| {
            Error::BackendError(format!("Failed to get Memcached connection: {}", e))
        })?;

        // Native decr clamps at zero; that quirk is part of this backend's
        // contract.
        let result = if delta >= 0 {
            conn.decrement(&full, delta as u64).await
        } else {
            conn.increment(&full, delta.unsigned_abs()).await
        };

        let value = result.map_err(|e| {
            Error::BackendError(format!("Memcached DECR failed for key {}: {}", key, e))
        })?;

        debug!("✓ Memcached DECR {} by {} -> {}", key, delta, value);
        Ok(value as i64)
    }

    async fn query_keys(&self, prefix: &str) -> Result<Vec<String>> {
        // No enumeration primitive in the protocol.
        warn!(
            "Memcached cannot enumerate keys; query_keys('{}') returns empty",
            prefix
        );
        Ok(Vec::new())
    }
}
