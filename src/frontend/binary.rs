//! Compact binary frontend (Postcard).
//!
//! Same contract as [`DataFrontend`](super::DataFrontend) with a denser
//! encoding; picking one over the other is purely a size/speed trade-off.
//! Postcard is not self-describing, so the value type is fixed at the
//! frontend's type parameter rather than decoded dynamically. Note that
//! binary payloads do not render as ASCII integers; counter operations
//! belong with the raw or data frontends.

use super::{CacheFrontend, DEFAULT_LIFETIME};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;

/// Postcard-encoding frontend for any serde-representable value type.
pub struct BinaryFrontend<T> {
    lifetime: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BinaryFrontend<T> {
    pub fn new() -> Self {
        BinaryFrontend {
            lifetime: DEFAULT_LIFETIME,
            _marker: PhantomData,
        }
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        BinaryFrontend {
            lifetime,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BinaryFrontend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BinaryFrontend<T> {
    fn clone(&self) -> Self {
        BinaryFrontend {
            lifetime: self.lifetime,
            _marker: PhantomData,
        }
    }
}

impl<T> CacheFrontend for BinaryFrontend<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    type Value = T;

    fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn before_store(&self, value: &T) -> Result<Vec<u8>> {
        postcard::to_allocvec(value).map_err(|e| Error::SerializationError(e.to_string()))
    }

    fn after_retrieve(&self, bytes: &[u8]) -> Result<T> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Fragment {
        title: String,
        hits: u64,
        pinned: bool,
        tags: Vec<String>,
    }

    #[test]
    fn test_struct_roundtrip() {
        let frontend = BinaryFrontend::<Fragment>::new();
        let value = Fragment {
            title: "sidebar".to_string(),
            hits: 42,
            pinned: true,
            tags: vec!["a".to_string(), "b".to_string()],
        };
        let bytes = frontend.before_store(&value).unwrap();
        assert_eq!(frontend.after_retrieve(&bytes).unwrap(), value);
    }

    #[test]
    fn test_sparse_sequence_roundtrip() {
        // Mixed presence models a sequence with explicit gaps.
        let frontend = BinaryFrontend::<Vec<Option<i64>>>::new();
        let value = vec![Some(1), None, Some(3), None, Some(-5)];
        let bytes = frontend.before_store(&value).unwrap();
        assert_eq!(frontend.after_retrieve(&bytes).unwrap(), value);
    }

    #[test]
    fn test_nested_and_null_roundtrip() {
        let frontend = BinaryFrontend::<Option<Vec<(String, Option<bool>)>>>::new();
        let value = Some(vec![
            ("on".to_string(), Some(true)),
            ("off".to_string(), Some(false)),
            ("unset".to_string(), None),
        ]);
        let bytes = frontend.before_store(&value).unwrap();
        assert_eq!(frontend.after_retrieve(&bytes).unwrap(), value);

        let none: Option<Vec<(String, Option<bool>)>> = None;
        let bytes = frontend.before_store(&none).unwrap();
        assert_eq!(frontend.after_retrieve(&bytes).unwrap(), none);
    }

    #[test]
    fn test_denser_than_json() {
        let frontend = BinaryFrontend::<Fragment>::new();
        let value = Fragment {
            title: "sidebar".to_string(),
            hits: 42,
            pinned: true,
            tags: vec!["navigation".to_string()],
        };
        let binary = frontend.before_store(&value).unwrap();
        let json = serde_json::to_vec(&value).unwrap();
        assert!(
            binary.len() < json.len(),
            "Postcard ({} bytes) should be smaller than JSON ({} bytes)",
            binary.len(),
            json.len()
        );
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let frontend = BinaryFrontend::<Fragment>::new();
        let value = Fragment {
            title: "x".repeat(64),
            hits: 1,
            pinned: false,
            tags: vec![],
        };
        let mut bytes = frontend.before_store(&value).unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(frontend.after_retrieve(&bytes).is_err());
    }
}
