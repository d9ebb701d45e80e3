//! Error types for the cache library.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations.
///
/// All cache operations return `Result<T>` where `Result` is defined as `std::result::Result<T, Error>`.
/// A plain miss is never an error: `get`/`start` report absent or expired
/// entries as `Ok(None)` and `exists` as `Ok(false)`.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when converting a value to cache bytes.
    ///
    /// This occurs when the frontend's codec rejects the value.
    /// Common causes:
    /// - Value contains non-serializable types
    /// - serde_json or Postcard codec error
    SerializationError(String),

    /// Deserialization failed when converting cache bytes back to a value.
    ///
    /// This indicates corrupted or malformed data in cache, or a counter
    /// operation against a payload that does not render as an integer.
    ///
    /// **Recovery:** Evict the cache entry and recompute.
    DeserializationError(String),

    /// Counter operation on a key that holds no live entry.
    ///
    /// Returned by `increment`/`decrement` on backends that refuse to
    /// conjure a value out of nothing (file, shared-memory, mongo).
    /// Backends with different native semantics (redis, inmemory) start
    /// from zero instead and never return this.
    CacheMiss,

    /// Backend storage error (connection lost, pool exhausted, protocol
    /// error, IO failure).
    ///
    /// Transport failures are not retried at this layer; retry policy, if
    /// any, belongs to the transport.
    BackendError(String),

    /// The façade was driven through an invalid start/save sequence.
    ///
    /// Raised for:
    /// - `start` while a capture session is already active
    /// - `save` with no explicit key and no active session
    /// - `echo` with no capturing session
    InvalidState(String),

    /// Operation not supported by this frontend or backend.
    ///
    /// Raised for:
    /// - output capture on a data/binary frontend
    /// - a backend capability the native store lacks
    NotSupported(String),

    /// Configuration error during backend construction.
    ///
    /// Common causes:
    /// - Invalid connection string
    /// - Missing required configuration (no servers, no cache dir)
    ConfigError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::CacheMiss => write!(f, "Cache miss"),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Error::DeserializationError(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}

#[cfg(feature = "mongo")]
impl From<mongodb::error::Error> for Error {
    fn from(e: mongodb::error::Error) -> Self {
        Error::BackendError(format!("Mongo error: {}", e))
    }
}
