//! Filesystem cache backend.
//!
//! One file per (prefixed) key under the configured cache directory. Each
//! file starts with a 4-byte little-endian lifetime header followed by the
//! raw payload; the entry's creation time is the file's modification time,
//! so lifetime and payload round-trip losslessly without any bookkeeping
//! outside the file itself. A lifetime of zero means the entry never
//! expires.
//!
//! Expiry is checked on every read; an expired file is unlinked on
//! detection and reported as a miss either way. Counters are
//! read-parse-rewrite and therefore NOT atomic across processes sharing
//! the directory; callers that need strict counters belong on a backend
//! with a native atomic primitive.

use super::{parse_counter, CacheBackend};
use crate::error::{Error, Result};
use crate::key::KeySpace;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::io::AsyncReadExt;

/// Size of the lifetime header at the start of every cache file.
const HEADER_LEN: usize = 4;

/// Configuration for the filesystem backend.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Directory holding one file per cache entry. Created if missing.
    pub cache_dir: PathBuf,
    /// Namespace prefix prepended to every file name.
    pub prefix: String,
}

impl FileConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        FileConfig {
            cache_dir: cache_dir.into(),
            prefix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Filesystem backend storing one file per key.
#[derive(Clone)]
pub struct FileBackend {
    cache_dir: PathBuf,
    keyspace: KeySpace,
}

impl FileBackend {
    /// Create a filesystem backend, creating the cache directory if needed.
    ///
    /// # Errors
    /// Returns `Err` if the directory cannot be created.
    pub async fn new(config: FileConfig) -> Result<Self> {
        if config.cache_dir.as_os_str().is_empty() {
            return Err(Error::ConfigError("cache_dir must not be empty".to_string()));
        }

        tokio::fs::create_dir_all(&config.cache_dir).await?;

        info!("✓ File backend initialized: {}", config.cache_dir.display());

        Ok(FileBackend {
            cache_dir: config.cache_dir,
            keyspace: KeySpace::new(config.prefix),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.cache_dir.join(self.keyspace.namespaced(key))
    }

    /// Whether the file at `path` holds a live entry, judging only by its
    /// lifetime header and modification time.
    async fn is_live(path: &Path) -> Result<bool> {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let mut header = [0u8; HEADER_LEN];
        if file.read_exact(&mut header).await.is_err() {
            // Truncated below the header: not a readable entry.
            return Ok(false);
        }
        let lifetime = u32::from_le_bytes(header);
        if lifetime == 0 {
            return Ok(true);
        }

        let modified = file.metadata().await?.modified()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(age < Duration::from_secs(u64::from(lifetime)))
    }

    /// Read the entry at `key`, returning its header lifetime alongside the
    /// payload so counter updates can preserve it.
    async fn read_entry(&self, key: &str) -> Result<Option<(u32, Vec<u8>)>> {
        let path = self.path_for(key);

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if raw.len() < HEADER_LEN {
            return Err(Error::DeserializationError(format!(
                "cache file {} is shorter than its header",
                path.display()
            )));
        }

        let lifetime = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if lifetime != 0 {
            let modified = tokio::fs::metadata(&path).await?.modified()?;
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO);
            if age >= Duration::from_secs(u64::from(lifetime)) {
                // Expired: unlink on detection.
                let _ = tokio::fs::remove_file(&path).await;
                return Ok(None);
            }
        }

        Ok(Some((lifetime, raw[HEADER_LEN..].to_vec())))
    }

    async fn write_entry(&self, key: &str, lifetime: u32, payload: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let mut raw = Vec::with_capacity(HEADER_LEN + payload.len());
        raw.extend_from_slice(&lifetime.to_le_bytes());
        raw.extend_from_slice(payload);
        tokio::fs::write(&path, raw).await?;
        Ok(())
    }
}

impl CacheBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.read_entry(key).await? {
            Some((_, payload)) => {
                debug!("✓ File GET {} -> HIT", key);
                Ok(Some(payload))
            }
            None => {
                debug!("✓ File GET {} -> MISS", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let lifetime = ttl
            .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
            .unwrap_or(0);

        self.write_entry(key, lifetime, &value).await?;
        debug!("✓ File SET {} (lifetime: {}s)", key, lifetime);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("✓ File DELETE {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        // Read-parse-rewrite; not atomic across processes.
        let (lifetime, payload) = self.read_entry(key).await?.ok_or(Error::CacheMiss)?;
        let next = parse_counter(&payload)? + delta;
        self.write_entry(key, lifetime, next.to_string().as_bytes())
            .await?;

        debug!("✓ File INCR {} by {} -> {}", key, delta, next);
        Ok(next)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.increment(key, -delta).await
    }

    async fn query_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(logical) = self.keyspace.logical(name) else {
                continue;
            };
            if !logical.starts_with(prefix) {
                continue;
            }
            if Self::is_live(&entry.path()).await? {
                keys.push(logical.to_string());
            }
        }

        debug!("✓ File QUERY_KEYS '{}' -> {} keys", prefix, keys.len());
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_backend(prefix: &str) -> (FileBackend, PathBuf) {
        let dir = std::env::temp_dir().join(format!("cachefront-test-{}", uuid::Uuid::now_v7()));
        let backend = FileBackend::new(FileConfig::new(&dir).with_prefix(prefix))
            .await
            .expect("Failed to create backend");
        (backend, dir)
    }

    #[tokio::test]
    async fn test_file_backend_set_get() {
        let (backend, dir) = temp_backend("").await;

        backend
            .set("test-data", b"nothing interesting".to_vec(), None)
            .await
            .expect("Failed to set");

        assert!(dir.join("test-data").exists());
        assert_eq!(
            backend.get("test-data").await.expect("Failed to get"),
            Some(b"nothing interesting".to_vec())
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_overwrite() {
        let (backend, dir) = temp_backend("").await;

        backend
            .set("test-data", b"first".to_vec(), None)
            .await
            .unwrap();
        backend
            .set("test-data", b"sure, nothing interesting".to_vec(), None)
            .await
            .unwrap();

        assert_eq!(
            backend.get("test-data").await.unwrap(),
            Some(b"sure, nothing interesting".to_vec())
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_prefix_in_file_name() {
        let (backend, dir) = temp_backend("unit").await;

        backend
            .set("testoutput", b"14:07:33".to_vec(), Some(Duration::from_secs(2)))
            .await
            .unwrap();

        assert!(dir.join("unittestoutput").exists());
        assert_eq!(backend.query_keys("").await.unwrap(), vec!["testoutput"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_header_roundtrip() {
        let (backend, dir) = temp_backend("").await;

        backend
            .set("entry", b"payload".to_vec(), Some(Duration::from_secs(300)))
            .await
            .unwrap();

        let raw = std::fs::read(dir.join("entry")).expect("Failed to read file");
        assert_eq!(&raw[..4], &300u32.to_le_bytes());
        assert_eq!(&raw[4..], b"payload");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_ttl_expiration() {
        let (backend, dir) = temp_backend("").await;

        backend
            .set("short", b"value".to_vec(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(backend.exists("short").await.unwrap());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(backend.get("short").await.unwrap(), None);
        // Unlinked on detection.
        assert!(!dir.join("short").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_zero_lifetime_never_expires() {
        let (backend, dir) = temp_backend("").await;

        backend.set("keep", b"value".to_vec(), None).await.unwrap();
        assert!(backend.exists("keep").await.unwrap());
        assert_eq!(backend.query_keys("").await.unwrap(), vec!["keep"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_delete() {
        let (backend, dir) = temp_backend("").await;

        backend.set("gone", b"value".to_vec(), None).await.unwrap();
        assert!(backend.delete("gone").await.unwrap());
        assert!(!backend.delete("gone").await.unwrap());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_increment_decrement() {
        let (backend, dir) = temp_backend("").await;

        backend.set("foo", b"1".to_vec(), None).await.unwrap();
        assert_eq!(backend.increment("foo", 1).await.unwrap(), 2);
        assert_eq!(backend.get("foo").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(backend.increment("foo", 5).await.unwrap(), 7);

        backend.set("bar", b"100".to_vec(), None).await.unwrap();
        assert_eq!(backend.decrement("bar", 1).await.unwrap(), 99);
        assert_eq!(backend.decrement("bar", 4).await.unwrap(), 95);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_increment_preserves_lifetime_header() {
        let (backend, dir) = temp_backend("").await;

        backend
            .set("counter", b"10".to_vec(), Some(Duration::from_secs(600)))
            .await
            .unwrap();
        backend.increment("counter", 1).await.unwrap();

        let raw = std::fs::read(dir.join("counter")).unwrap();
        assert_eq!(&raw[..4], &600u32.to_le_bytes());
        assert_eq!(&raw[4..], b"11");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_increment_absent_is_miss() {
        let (backend, dir) = temp_backend("").await;

        assert!(matches!(
            backend.increment("ghost", 1).await,
            Err(Error::CacheMiss)
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_query_keys_prefix_filter() {
        let (backend, dir) = temp_backend("").await;

        backend.set("a", b"1".to_vec(), None).await.unwrap();
        backend.set("long-key", b"2".to_vec(), None).await.unwrap();
        backend.set("bcd", b"3".to_vec(), None).await.unwrap();

        let mut keys = backend.query_keys("").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "bcd", "long-key"]);
        assert_eq!(backend.query_keys("long").await.unwrap(), vec!["long-key"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_file_backend_persists_across_instances() {
        let (backend, dir) = temp_backend("").await;

        backend
            .set("durable", b"value".to_vec(), None)
            .await
            .unwrap();
        drop(backend);

        let reopened = FileBackend::new(FileConfig::new(&dir))
            .await
            .expect("Failed to reopen");
        assert_eq!(
            reopened.get("durable").await.unwrap(),
            Some(b"value".to_vec())
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
