//! MongoDB cache backend.
//!
//! One document per (prefixed) key in a configurable collection:
//!
//! ```text
//! { key: "<prefixed key>", data: <binary payload>, expires_at: <unix secs, 0 = none> }
//! ```
//!
//! MongoDB has no per-document TTL passthrough at write time (TTL indexes
//! sweep on their own schedule), so expiry is embedded in the document and
//! checked on every read; an expired document is deleted on detection and
//! reported as a miss either way. Counters are read-modify-write over the
//! stored payload, best effort under concurrent external writers, same as
//! the filesystem backend.

use super::{parse_counter, CacheBackend};
use crate::error::{Error, Result};
use crate::key::KeySpace;
use futures::TryStreamExt;
use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{doc, Binary};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Configuration for the MongoDB backend.
#[derive(Clone, Debug)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Namespace prefix prepended to every key.
    pub prefix: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "cachefront".to_string(),
            collection: "cache_entries".to_string(),
            prefix: String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    key: String,
    data: Binary,
    /// Unix seconds after which the entry reads as absent; 0 = never.
    expires_at: i64,
}

impl CacheDocument {
    fn is_expired(&self) -> bool {
        self.expires_at != 0 && unix_now() >= self.expires_at
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs() as i64
}

/// MongoDB backend storing one document per key.
///
/// # Example
///
/// ```no_run
/// # use cachefront::backend::{MongoBackend, MongoConfig, CacheBackend};
/// # use cachefront::error::Result;
/// # async fn example() -> Result<()> {
/// let backend = MongoBackend::new(MongoConfig::default()).await?;
/// backend.set("key", b"value".to_vec(), None).await?;
/// let value = backend.get("key").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MongoBackend {
    collection: Collection<CacheDocument>,
    keyspace: KeySpace,
}

impl MongoBackend {
    /// Connect and create a MongoDB backend.
    ///
    /// # Errors
    /// Returns `Err` if the connection cannot be established.
    pub async fn new(config: MongoConfig) -> Result<Self> {
        let options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| Error::ConfigError(format!("Invalid MongoDB URI: {}", e)))?;
        let client = Client::with_options(options)
            .map_err(|e| Error::BackendError(format!("Failed to create MongoDB client: {}", e)))?;

        // Ping to verify the connection before handing the backend out.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!(
            "✓ Mongo backend initialized: {}/{}.{}",
            config.uri, config.database, config.collection
        );

        let collection = client
            .database(&config.database)
            .collection(&config.collection);

        Ok(MongoBackend {
            collection,
            keyspace: KeySpace::new(config.prefix),
        })
    }

    /// Fetch the live document for `key`, deleting it if expired.
    async fn find_live(&self, full: &str) -> Result<Option<CacheDocument>> {
        let document = self.collection.find_one(doc! { "key": full }).await?;

        match document {
            Some(d) if d.is_expired() => {
                self.collection.delete_one(doc! { "key": full }).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }
}

impl CacheBackend for MongoBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full = self.keyspace.namespaced(key);

        match self.find_live(&full).await? {
            Some(document) => {
                debug!("✓ Mongo GET {} -> HIT", key);
                Ok(Some(document.data.bytes))
            }
            None => {
                debug!("✓ Mongo GET {} -> MISS", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let full = self.keyspace.namespaced(key);

        let expires_at = ttl.map(|d| unix_now() + d.as_secs() as i64).unwrap_or(0);
        let document = CacheDocument {
            key: full.clone(),
            data: Binary {
                subtype: BinarySubtype::Generic,
                bytes: value,
            },
            expires_at,
        };

        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();
        self.collection
            .replace_one(doc! { "key": &full }, document)
            .with_options(options)
            .await?;

        debug!("✓ Mongo SET {} (expires_at: {})", key, expires_at);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let full = self.keyspace.namespaced(key);
        let result = self.collection.delete_one(doc! { "key": &full }).await?;

        debug!("✓ Mongo DELETE {} -> {}", key, result.deleted_count > 0);
        Ok(result.deleted_count > 0)
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let full = self.keyspace.namespaced(key);

        // Read-modify-write; concurrent external writers can interleave.
        let document = self.find_live(&full).await?.ok_or(Error::CacheMiss)?;
        let next = parse_counter(&document.data.bytes)? + delta;

        self.collection
            .update_one(
                doc! { "key": &full },
                doc! { "$set": { "data": Binary {
                    subtype: BinarySubtype::Generic,
                    bytes: next.to_string().into_bytes(),
                } } },
            )
            .await?;

        debug!("✓ Mongo INCR {} by {} -> {}", key, delta, next);
        Ok(next)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.increment(key, -delta).await
    }

    async fn query_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor = self.collection.find(doc! {}).await?;

        while let Some(document) = cursor.try_next().await? {
            if document.is_expired() {
                continue;
            }
            if let Some(logical) = self.keyspace.logical(&document.key) {
                if logical.starts_with(prefix) {
                    keys.push(logical.to_string());
                }
            }
        }

        debug!("✓ Mongo QUERY_KEYS '{}' -> {} keys", prefix, keys.len());
        Ok(keys)
    }
}
