//! Process-wide shared-memory cache backend.
//!
//! The accelerator-cache analogue: one store for the whole process, shared
//! by every `SharedMemoryBackend` instance no matter where it was built.
//! Instances are distinguished only by their namespace prefix, which is how
//! several logical caches coexist in the one physical store. Contrast with
//! [`InMemoryBackend`](super::InMemoryBackend), whose store is scoped to
//! the instance.
//!
//! Counters use the map's per-key entry lock, so they are atomic across
//! every handle in the process. A counter operation on an absent or expired
//! key returns `Error::CacheMiss`; the shared store does not initialize
//! counters implicitly.

use super::{parse_counter, CacheBackend};
use crate::error::{Error, Result};
use crate::key::KeySpace;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::time::{Duration, SystemTime};

struct SharedEntry {
    data: Vec<u8>,
    expires_at: Option<SystemTime>,
}

impl SharedEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| SystemTime::now() + d);
        SharedEntry { data, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| SystemTime::now() >= exp)
    }
}

static SHARED_STORE: Lazy<DashMap<String, SharedEntry>> = Lazy::new(DashMap::new);

/// Backend over the process-global shared store.
#[derive(Clone, Default)]
pub struct SharedMemoryBackend {
    keyspace: KeySpace,
}

impl SharedMemoryBackend {
    /// Create a handle to the process-global store with no prefix.
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Create a handle whose keys carry `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        SharedMemoryBackend {
            keyspace: KeySpace::new(prefix),
        }
    }
}

impl CacheBackend for SharedMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full = self.keyspace.namespaced(key);

        if let Some(entry) = SHARED_STORE.get(&full) {
            if !entry.is_expired() {
                debug!("✓ Shared GET {} -> HIT", key);
                return Ok(Some(entry.data.clone()));
            }
        } else {
            debug!("✓ Shared GET {} -> MISS", key);
            return Ok(None);
        }

        SHARED_STORE.remove(&full);
        debug!("✓ Shared GET {} -> MISS (expired)", key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let full = self.keyspace.namespaced(key);
        SHARED_STORE.insert(full, SharedEntry::new(value, ttl));
        debug!("✓ Shared SET {} (TTL: {:?})", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let full = self.keyspace.namespaced(key);
        let removed = SHARED_STORE.remove(&full).is_some();
        debug!("✓ Shared DELETE {} -> {}", key, removed);
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full = self.keyspace.namespaced(key);
        if let Some(entry) = SHARED_STORE.get(&full) {
            return Ok(!entry.is_expired());
        }

        Ok(false)
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let full = self.keyspace.namespaced(key);

        // get_mut holds the shard lock across the read-modify-write.
        let Some(mut entry) = SHARED_STORE.get_mut(&full) else {
            return Err(Error::CacheMiss);
        };
        if entry.is_expired() {
            drop(entry);
            SHARED_STORE.remove(&full);
            return Err(Error::CacheMiss);
        }

        let next = parse_counter(&entry.data)? + delta;
        entry.data = next.to_string().into_bytes();

        debug!("✓ Shared INCR {} by {} -> {}", key, delta, next);
        Ok(next)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.increment(key, -delta).await
    }

    async fn query_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let keys: Vec<String> = SHARED_STORE
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .filter_map(|entry| {
                self.keyspace
                    .logical(entry.key())
                    .filter(|logical| logical.starts_with(prefix))
                    .map(str::to_string)
            })
            .collect();

        debug!("✓ Shared QUERY_KEYS '{}' -> {} keys", prefix, keys.len());
        Ok(keys)
    }
}
