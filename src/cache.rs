//! Cache façade binding one frontend to one backend.
//!
//! This is the public entry point. The façade owns the output-capture state
//! machine: `start(key)` either replays a stored entry (a *fresh* session,
//! the caller must not regenerate) or opens a capture window the caller
//! fills through `echo` before `save` persists it. All the plain operations
//! (`get`, `exists`, `delete`, `query_keys`, `increment`, `decrement`) pass
//! through the frontend/backend pair directly.

use crate::backend::CacheBackend;
use crate::capture::CaptureBuffer;
use crate::error::{Error, Result};
use crate::frontend::CacheFrontend;
use crate::observability::{CacheMetrics, NoOpMetrics};
use std::time::{Duration, Instant};

/// State for one `start`/`save` cycle.
///
/// Owned exclusively by the façade; created by `start`, consumed by `save`.
/// At most one session is active per façade at a time.
struct CaptureSession {
    key: String,
    lifetime: Option<Duration>,
    /// True when `start` served existing content, so the following `save`
    /// must be a no-op.
    fresh: bool,
}

/// Cache façade over a frontend/backend pair.
///
/// # Example
///
/// ```ignore
/// use cachefront::{Cache, backend::InMemoryBackend, frontend::DataFrontend};
///
/// let mut cache = Cache::new(DataFrontend::<u64>::new(), InMemoryBackend::new());
/// cache.save(Some("answer"), Some(&42), None, true).await?;
/// assert_eq!(cache.get("answer").await?, Some(42));
/// ```
pub struct Cache<F: CacheFrontend, B: CacheBackend> {
    frontend: F,
    backend: B,
    metrics: Box<dyn CacheMetrics>,
    session: Option<CaptureSession>,
    buffer: CaptureBuffer,
}

impl<F: CacheFrontend, B: CacheBackend> Cache<F, B> {
    /// Bind a frontend to a backend.
    pub fn new(frontend: F, backend: B) -> Self {
        Cache {
            frontend,
            backend,
            metrics: Box::new(NoOpMetrics),
            session: None,
            buffer: CaptureBuffer::new(),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// True iff a `start`/`save` cycle is in progress.
    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a start/save cycle for `key`.
    ///
    /// On a hit the stored value is returned and the session is marked
    /// fresh: the caller must serve the returned content and the following
    /// [`save`](Self::save) closes the cycle without writing. On a miss a
    /// capture window opens, `None` is returned, and the caller produces
    /// the content, through [`echo`](Self::echo) or as an explicit value
    /// on `save`.
    ///
    /// `lifetime` overrides the frontend default for the save that closes
    /// this cycle.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` if a session is already active;
    /// sessions do not nest.
    pub async fn start(&mut self, key: &str, lifetime: Option<Duration>) -> Result<Option<F::Value>> {
        if self.session.is_some() {
            return Err(Error::InvalidState(format!(
                "start('{}') while a session is already active",
                key
            )));
        }

        let timer = Instant::now();
        let bytes = match self.backend.get(key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                return Err(e);
            }
        };

        match bytes {
            Some(bytes) => {
                let value = self.frontend.after_retrieve(&bytes)?;
                self.session = Some(CaptureSession {
                    key: key.to_string(),
                    lifetime,
                    fresh: true,
                });
                self.metrics.record_hit(key, timer.elapsed());
                debug!("» start('{}') -> fresh (replaying stored content)", key);
                Ok(Some(value))
            }
            None => {
                self.buffer.begin();
                self.session = Some(CaptureSession {
                    key: key.to_string(),
                    lifetime,
                    fresh: false,
                });
                self.metrics.record_miss(key, timer.elapsed());
                debug!("» start('{}') -> capturing", key);
                Ok(None)
            }
        }
    }

    /// Append output to the active capture window.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` when no capturing session is active
    /// (including fresh sessions, whose content already exists).
    pub fn echo(&mut self, chunk: &str) -> Result<()> {
        match &self.session {
            Some(session) if !session.fresh => {
                self.buffer.write(chunk);
                Ok(())
            }
            Some(_) => Err(Error::InvalidState(
                "echo() on a fresh session; stored content is already being served".to_string(),
            )),
            None => Err(Error::InvalidState(
                "echo() without an active session".to_string(),
            )),
        }
    }

    /// Output captured so far, when a capture window is open.
    pub fn captured(&self) -> Option<&str> {
        self.buffer
            .is_capturing()
            .then(|| self.buffer.contents())
    }

    /// Persist a value and close any active session.
    ///
    /// Resolution rules:
    /// - key: explicit argument, else the active session's key
    /// - content: explicit argument, else the captured output
    /// - lifetime: explicit argument, else the one given to `start`, else
    ///   the frontend default
    ///
    /// A fresh session makes this a no-op close returning `Ok(false)`; the
    /// stored entry (and its TTL) is left untouched. Otherwise returns
    /// `Ok(true)` once the entry is written.
    ///
    /// `stop_buffer` controls whether the capture window is also closed and
    /// cleared; pass `false` to keep the captured content readable after
    /// persisting it.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` when the key or the content would have
    /// to come from a session that does not exist.
    pub async fn save(
        &mut self,
        key: Option<&str>,
        value: Option<&F::Value>,
        lifetime: Option<Duration>,
        stop_buffer: bool,
    ) -> Result<bool> {
        let session = self.session.take();

        if let Some(session) = &session {
            if session.fresh {
                if stop_buffer {
                    self.buffer.stop();
                }
                debug!("» save() closing fresh session for '{}'", session.key);
                return Ok(false);
            }
        }

        let key = match (key, &session) {
            (Some(key), _) => key.to_string(),
            (None, Some(session)) => session.key.clone(),
            (None, None) => {
                return Err(Error::InvalidState(
                    "save() without an active session requires an explicit key".to_string(),
                ))
            }
        };

        let bytes = match value {
            Some(value) => self.frontend.before_store(value)?,
            None => {
                if session.is_none() {
                    return Err(Error::InvalidState(
                        "save() without an active session requires an explicit value".to_string(),
                    ));
                }
                // Leave the window contents alone; `stop_buffer` decides
                // below whether the window closes.
                let captured = self.buffer.contents().to_string();
                let value = self.frontend.value_from_capture(captured)?;
                self.frontend.before_store(&value)?
            }
        };

        let ttl = lifetime
            .or(session.as_ref().and_then(|s| s.lifetime))
            .unwrap_or_else(|| self.frontend.lifetime());

        let timer = Instant::now();
        if let Err(e) = self.backend.set(&key, bytes, Some(ttl)).await {
            self.metrics.record_error(&key, &e.to_string());
            return Err(e);
        }
        self.metrics.record_set(&key, timer.elapsed());

        if stop_buffer {
            self.buffer.stop();
        }

        debug!("» save('{}') stored (TTL: {:?})", key, ttl);
        Ok(true)
    }

    /// Retrieve and decode the value at `key`.
    ///
    /// Absent and expired entries both come back as `Ok(None)`.
    pub async fn get(&self, key: &str) -> Result<Option<F::Value>> {
        let timer = Instant::now();
        let bytes = match self.backend.get(key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                return Err(e);
            }
        };

        match bytes {
            Some(bytes) => {
                let value = self.frontend.after_retrieve(&bytes)?;
                self.metrics.record_hit(key, timer.elapsed());
                Ok(Some(value))
            }
            None => {
                self.metrics.record_miss(key, timer.elapsed());
                Ok(None)
            }
        }
    }

    /// Check whether a live entry exists at `key`.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(key).await
    }

    /// Remove the entry at `key`. Idempotent; `Ok(false)` when absent.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let timer = Instant::now();
        let removed = self.backend.delete(key).await?;
        self.metrics.record_delete(key, timer.elapsed());
        Ok(removed)
    }

    /// List live logical keys starting with `prefix` (pass `""` for all).
    ///
    /// Order is unspecified; backends without an enumeration primitive
    /// return an empty list.
    pub async fn query_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.backend.query_keys(prefix).await
    }

    /// Add `delta` to the counter at `key`, returning the new value.
    pub async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.backend.increment(key, delta).await
    }

    /// Subtract `delta` from the counter at `key`, returning the new value.
    pub async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.backend.decrement(key, delta).await
    }

    /// Get frontend reference (for advanced use).
    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::frontend::{DataFrontend, OutputFrontend};

    fn output_cache(lifetime: Duration) -> Cache<OutputFrontend, InMemoryBackend> {
        Cache::new(
            OutputFrontend::with_lifetime(lifetime),
            InMemoryBackend::new(),
        )
    }

    #[tokio::test]
    async fn test_start_miss_capture_save() {
        let mut cache = output_cache(Duration::from_secs(60));

        assert!(!cache.is_started());
        let content = cache.start("x", None).await.expect("Failed to start");
        assert!(content.is_none());
        assert!(cache.is_started());

        cache.echo("hello").expect("Failed to echo");
        let stored = cache.save(None, None, None, true).await.expect("Failed to save");
        assert!(stored);
        assert!(!cache.is_started());

        assert_eq!(cache.get("x").await.unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_second_start_is_fresh_and_save_is_noop() {
        let mut cache = output_cache(Duration::from_secs(60));

        cache.start("frag", None).await.unwrap();
        cache.echo("rendered once").unwrap();
        cache.save(None, None, None, true).await.unwrap();

        let content = cache.start("frag", None).await.expect("Failed to start");
        assert_eq!(content, Some("rendered once".to_string()));
        assert!(cache.is_started());

        // Fresh session: save must not write.
        let stored = cache.save(None, None, None, true).await.unwrap();
        assert!(!stored);
        assert!(!cache.is_started());
        assert_eq!(
            cache.get("frag").await.unwrap(),
            Some("rendered once".to_string())
        );
    }

    #[tokio::test]
    async fn test_nested_start_rejected() {
        let mut cache = output_cache(Duration::from_secs(60));

        cache.start("a", None).await.unwrap();
        let result = cache.start("b", None).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));

        // The original session is still intact.
        assert!(cache.is_started());
        cache.echo("content").unwrap();
        assert!(cache.save(None, None, None, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_without_session_requires_key_and_value() {
        let mut cache = output_cache(Duration::from_secs(60));

        let no_key = cache.save(None, None, None, true).await;
        assert!(matches!(no_key, Err(Error::InvalidState(_))));

        let no_value = cache.save(Some("k"), None, None, true).await;
        assert!(matches!(no_value, Err(Error::InvalidState(_))));

        // Both explicit: fine without a session.
        let value = "direct".to_string();
        assert!(cache.save(Some("k"), Some(&value), None, true).await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_echo_without_capture_rejected() {
        let mut cache = output_cache(Duration::from_secs(60));

        assert!(matches!(cache.echo("x"), Err(Error::InvalidState(_))));

        // Fresh sessions reject echo as well.
        let value = "stored".to_string();
        cache.save(Some("k"), Some(&value), None, true).await.unwrap();
        cache.start("k", None).await.unwrap();
        assert!(matches!(cache.echo("x"), Err(Error::InvalidState(_))));
        cache.save(None, None, None, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_session_expires_with_entry() {
        let mut cache = output_cache(Duration::from_millis(100));

        cache.start("t", None).await.unwrap();
        cache.echo("first").unwrap();
        cache.save(None, None, None, true).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        // Entry expired: start captures again instead of replaying.
        let content = cache.start("t", None).await.unwrap();
        assert!(content.is_none());
        cache.echo("second").unwrap();
        cache.save(None, None, None, true).await.unwrap();
        assert_eq!(cache.get("t").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_save_keeps_capture_readable_when_not_stopping() {
        let mut cache = output_cache(Duration::from_secs(60));

        cache.start("page", None).await.unwrap();
        cache.echo("body").unwrap();
        cache.save(None, None, None, false).await.unwrap();

        // Window still open: the captured content stays readable.
        assert_eq!(cache.captured(), Some("body"));

        // The session itself is gone even though the window is open.
        assert!(cache.echo("more").is_err());
    }

    #[tokio::test]
    async fn test_explicit_lifetime_beats_frontend_default() {
        let mut cache = output_cache(Duration::from_secs(3600));

        let value = "short-lived".to_string();
        cache
            .save(Some("s"), Some(&value), Some(Duration::from_millis(100)), true)
            .await
            .unwrap();
        assert!(cache.exists("s").await.unwrap());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!cache.exists("s").await.unwrap());
    }

    #[tokio::test]
    async fn test_start_lifetime_applies_to_save() {
        let mut cache = output_cache(Duration::from_secs(3600));

        cache
            .start("short", Some(Duration::from_millis(100)))
            .await
            .unwrap();
        cache.echo("x").unwrap();
        cache.save(None, None, None, true).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get("short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_data_cache_counters() {
        let mut cache = Cache::new(DataFrontend::<i64>::new(), InMemoryBackend::new());

        cache.save(Some("foo"), Some(&1), None, true).await.unwrap();
        assert_eq!(cache.increment("foo", 1).await.unwrap(), 2);
        assert_eq!(cache.increment("foo", 5).await.unwrap(), 7);
        assert_eq!(cache.get("foo").await.unwrap(), Some(7));

        cache.save(Some("bar"), Some(&100), None, true).await.unwrap();
        assert_eq!(cache.decrement("bar", 1).await.unwrap(), 99);
        assert_eq!(cache.decrement("bar", 4).await.unwrap(), 95);
    }

    #[tokio::test]
    async fn test_delete_absent_is_false() {
        let cache = Cache::new(DataFrontend::<i64>::new(), InMemoryBackend::new());
        assert!(!cache.delete("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_metrics_observe_hits_and_misses() {
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct CountingMetrics {
            hits: Arc<Mutex<usize>>,
            misses: Arc<Mutex<usize>>,
        }

        impl CacheMetrics for CountingMetrics {
            fn record_hit(&self, _key: &str, _duration: Duration) {
                *self.hits.lock().expect("Failed to lock hits") += 1;
            }

            fn record_miss(&self, _key: &str, _duration: Duration) {
                *self.misses.lock().expect("Failed to lock misses") += 1;
            }
        }

        let metrics = CountingMetrics {
            hits: Arc::new(Mutex::new(0)),
            misses: Arc::new(Mutex::new(0)),
        };

        let mut cache = Cache::new(DataFrontend::<String>::new(), InMemoryBackend::new())
            .with_metrics(Box::new(metrics.clone()));

        assert!(cache.get("k").await.unwrap().is_none());
        let v = "v".to_string();
        cache.save(Some("k"), Some(&v), None, true).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        assert_eq!(*metrics.hits.lock().unwrap(), 1);
        assert_eq!(*metrics.misses.lock().unwrap(), 1);
    }
}
