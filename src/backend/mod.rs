//! Cache backend implementations.

use crate::error::{Error, Result};
use std::time::Duration;

#[cfg(feature = "file")]
pub mod file;
#[cfg(feature = "inmemory")]
pub mod inmemory;
#[cfg(feature = "memcached")]
pub mod memcached;
#[cfg(feature = "mongo")]
pub mod mongo;
#[cfg(feature = "redis")]
pub mod redis;
#[cfg(feature = "shared")]
pub mod shared;

#[cfg(feature = "file")]
pub use file::{FileBackend, FileConfig};
#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryBackend;
#[cfg(feature = "memcached")]
pub use memcached::{MemcachedBackend, MemcachedConfig};
#[cfg(feature = "mongo")]
pub use mongo::{MongoBackend, MongoConfig};
#[cfg(feature = "redis")]
pub use redis::{RedisBackend, RedisConfig};
#[cfg(feature = "shared")]
pub use shared::SharedMemoryBackend;

/// Trait for cache backend implementations.
///
/// Abstracts uniform key/value/TTL storage over one physical medium, so
/// backends are swappable under the same façade. Every method takes the
/// LOGICAL key; implementations apply their configured namespace prefix
/// before touching storage and strip it again in `query_keys`.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow
/// concurrent access. Implementations use interior mutability
/// (DashMap, pools, or external storage).
///
/// **ASYNC:** All methods are async and must be awaited.
#[allow(async_fn_in_trait)]
pub trait CacheBackend: Send + Sync + Clone {
    /// Retrieve the payload stored at `key`.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` - live entry found
    /// - `Ok(None)` - key absent or entry expired (indistinguishable)
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs (connection lost, IO, etc.)
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a payload at `key`.
    ///
    /// # Arguments
    /// - `ttl`: lifetime after which the entry reads as absent.
    ///   `None` = never expires.
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Remove the entry at `key`.
    ///
    /// Idempotent: returns `Ok(false)` when nothing was stored, never an
    /// error.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check whether a live (non-expired) entry exists at `key`.
    ///
    /// # Errors
    /// Returns `Err` if a backend error occurs
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Atomically add `delta` to the integer stored at `key`, returning the
    /// new value.
    ///
    /// Only backends whose native store has an atomic counter primitive are
    /// atomic under concurrent external writers; the others emulate with
    /// read-modify-write and document that as best effort. Behavior on an
    /// absent key is pinned per backend.
    async fn increment(&self, key: &str, delta: i64) -> Result<i64>;

    /// Symmetric to [`increment`](Self::increment). The result may go
    /// negative unless the native store clamps (memcached clamps at zero;
    /// that quirk is preserved, not papered over).
    async fn decrement(&self, key: &str, delta: i64) -> Result<i64>;

    /// List logical keys with the given prefix currently stored live.
    ///
    /// Backends without an enumeration primitive return an empty list for
    /// the unfiltered case; order is unspecified.
    async fn query_keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Parse a stored payload as an integer for counter emulation.
///
/// Counter payloads are the ASCII rendering the raw/data frontends produce
/// for plain integers, the same representation Redis and Memcached require
/// for their native counters.
pub(crate) fn parse_counter(bytes: &[u8]) -> Result<i64> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::DeserializationError("counter payload is not UTF-8".to_string()))?;
    text.trim().parse::<i64>().map_err(|_| {
        Error::DeserializationError(format!("counter payload is not an integer: {:?}", text))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "inmemory")]
    #[tokio::test]
    async fn test_backend_exists_default() {
        let backend = InMemoryBackend::new();
        backend
            .set("key", vec![1, 2, 3], None)
            .await
            .expect("Failed to set key");
        assert!(backend.exists("key").await.expect("Failed to check exists"));
        assert!(!backend
            .exists("nonexistent")
            .await
            .expect("Failed to check exists"));
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter(b"42").unwrap(), 42);
        assert_eq!(parse_counter(b"-7").unwrap(), -7);
        assert!(parse_counter(b"nope").is_err());
        assert!(parse_counter(&[0xff]).is_err());
    }
}
