//! # cachefront
//!
//! Frontend/backend caching for Rust: store, retrieve and invalidate
//! serialized values across interchangeable storage backends without the
//! caller knowing which one is active.
//!
//! ## Features
//!
//! - **Swappable Backends:** in-memory, process-shared memory, filesystem,
//!   Memcached, Redis, MongoDB behind one contract and one façade
//! - **Pluggable Frontends:** raw output passthrough, JSON data, compact
//!   Postcard binary, each carrying its own default lifetime
//! - **Per-Entry TTL:** expired entries read as absent everywhere, swept
//!   lazily or eagerly per backend
//! - **Output Capture:** the `start`/`save` pattern for fragment caching,
//!   with the capture buffer owned by the cache instead of global state
//! - **Counters:** `increment`/`decrement` with each store's native
//!   semantics preserved (and documented) rather than unified away
//! - **Namespaces:** per-backend key prefixes so logical caches share one
//!   physical medium without collisions
//!
//! ## Quick Start
//!
//! ```ignore
//! use cachefront::{Cache, backend::InMemoryBackend, frontend::OutputFrontend};
//! use std::time::Duration;
//!
//! let mut cache = Cache::new(
//!     OutputFrontend::with_lifetime(Duration::from_secs(300)),
//!     InMemoryBackend::new(),
//! );
//!
//! // Fragment caching: regenerate only on a miss.
//! match cache.start("sidebar", None).await? {
//!     Some(html) => serve(html),                // replayed from cache
//!     None => {
//!         cache.echo(&render_sidebar());        // expensive render
//!         cache.save(None, None, None, true).await?;
//!     }
//! }
//!
//! // Plain data caching through the same façade.
//! use cachefront::frontend::DataFrontend;
//! let mut counters = Cache::new(DataFrontend::<i64>::new(), InMemoryBackend::new());
//! counters.save(Some("hits"), Some(&1), None, true).await?;
//! assert_eq!(counters.increment("hits", 1).await?, 2);
//! ```
//!
//! Backends holding remote connections are feature-gated: enable `redis`,
//! `memcached` or `mongo` to pull in the respective driver.

#[macro_use]
extern crate log;

pub mod backend;
pub mod cache;
pub mod capture;
pub mod error;
pub mod frontend;
pub mod key;
pub mod observability;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use cache::Cache;
pub use capture::CaptureBuffer;
pub use error::{Error, Result};
pub use frontend::{BinaryFrontend, CacheFrontend, DataFrontend, OutputFrontend};
pub use key::KeySpace;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
