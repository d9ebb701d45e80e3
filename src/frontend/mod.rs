//! Cache frontend implementations.
//!
//! A frontend decides how a logical value becomes storable bytes and back,
//! and what the default entry lifetime is. Backends never interpret the
//! payload (the one exception being the integer rendering that
//! `increment`/`decrement` rely on), so frontends and backends combine
//! freely.

use crate::error::{Error, Result};
use std::time::Duration;

pub mod binary;
pub mod data;
pub mod output;

pub use binary::BinaryFrontend;
pub use data::DataFrontend;
pub use output::OutputFrontend;

/// Default entry lifetime when a frontend is built without an explicit one.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Trait for cache frontend implementations.
///
/// A frontend is stateless apart from its configuration and may be shared
/// across any number of caches.
pub trait CacheFrontend: Send + Sync {
    /// The logical value type this frontend stores and retrieves.
    type Value;

    /// Default lifetime applied when a save call does not carry one.
    fn lifetime(&self) -> Duration;

    /// Encode a value into storable bytes.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if the codec rejects the value.
    fn before_store(&self, value: &Self::Value) -> Result<Vec<u8>>;

    /// Decode stored bytes back into a value. Exact inverse of
    /// [`before_store`](Self::before_store).
    ///
    /// # Errors
    /// Returns `Error::DeserializationError` on corrupt payloads; corrupt
    /// data is never silently returned.
    fn after_retrieve(&self, bytes: &[u8]) -> Result<Self::Value>;

    /// Convert captured sink output into a storable value.
    ///
    /// Only the raw output frontend supports this; structured frontends
    /// require an explicit value on `save`.
    fn value_from_capture(&self, _captured: String) -> Result<Self::Value> {
        Err(Error::NotSupported(
            "output capture requires the raw output frontend".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_rejected_by_default() {
        let frontend = DataFrontend::<u32>::new();
        let result = frontend.value_from_capture("47".to_string());
        assert!(matches!(result, Err(Error::NotSupported(_))));
    }
}
