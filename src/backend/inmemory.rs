//! In-memory cache backend (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! TTL expiration is handled lazily on access. The store is scoped to the
//! backend instance: a fresh `new()` starts empty, while `Clone` hands out
//! a second handle to the same store. Nothing survives a process restart.

use super::{parse_counter, CacheBackend};
use crate::error::Result;
use crate::key::KeySpace;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

/// In-memory cache entry with optional expiration.
struct MemoryEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        MemoryEntry { data, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// Thread-safe async in-memory cache backend.
///
/// Counters are read-modify-write under the per-key shard lock, so they are
/// atomic within the process; there is no cross-process story here at all.
/// An `increment`/`decrement` on an absent key starts from zero.
///
/// # Example
///
/// ```no_run
/// use cachefront::backend::{InMemoryBackend, CacheBackend};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///
///     backend.set("key1", b"value".to_vec(), None).await?;
///     let value = backend.get("key1").await?;
///     assert!(value.is_some());
///
///     backend.set("key2", b"expires".to_vec(), Some(Duration::from_secs(300))).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, MemoryEntry>>,
    keyspace: KeySpace,
}

impl InMemoryBackend {
    /// Create a new in-memory cache backend with no namespace prefix.
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Create a new in-memory cache backend whose keys carry `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
            keyspace: KeySpace::new(prefix),
        }
    }

    /// Current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full = self.keyspace.namespaced(key);

        if let Some(entry) = self.store.get(&full) {
            if !entry.is_expired() {
                debug!("✓ InMemory GET {} -> HIT", key);
                return Ok(Some(entry.data.clone()));
            }
        } else {
            debug!("✓ InMemory GET {} -> MISS", key);
            return Ok(None);
        }

        // Expired: sweep lazily.
        self.store.remove(&full);
        debug!("✓ InMemory GET {} -> MISS (expired)", key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let full = self.keyspace.namespaced(key);
        self.store.insert(full, MemoryEntry::new(value, ttl));

        if let Some(d) = ttl {
            debug!("✓ InMemory SET {} (TTL: {:?})", key, d);
        } else {
            debug!("✓ InMemory SET {}", key);
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let full = self.keyspace.namespaced(key);
        let removed = self.store.remove(&full).is_some();
        debug!("✓ InMemory DELETE {} -> {}", key, removed);
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full = self.keyspace.namespaced(key);
        if let Some(entry) = self.store.get(&full) {
            return Ok(!entry.is_expired());
        }

        Ok(false)
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let full = self.keyspace.namespaced(key);

        // The entry API holds the shard lock across the read-modify-write,
        // so concurrent increments through any handle to this store agree.
        let mut entry = self
            .store
            .entry(full)
            .or_insert_with(|| MemoryEntry::new(b"0".to_vec(), None));

        let current = if entry.is_expired() {
            entry.expires_at = None;
            0
        } else {
            parse_counter(&entry.data)?
        };
        let next = current + delta;
        entry.data = next.to_string().into_bytes();

        debug!("✓ InMemory INCR {} by {} -> {}", key, delta, next);
        Ok(next)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.increment(key, -delta).await
    }

    async fn query_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let keys: Vec<String> = self
            .store
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .filter_map(|entry| {
                self.keyspace
                    .logical(entry.key())
                    .filter(|logical| logical.starts_with(prefix))
                    .map(str::to_string)
            })
            .collect();

        debug!("✓ InMemory QUERY_KEYS '{}' -> {} keys", prefix, keys.len());
        Ok(keys)
    }
}
