//! Structured-data frontend (serde_json).
//!
//! Stores arbitrary value graphs (scalars, nested collections, booleans,
//! nulls) as JSON text. JSON keeps integer payloads in the ASCII rendering
//! the backends' counter operations expect, so `save("foo", 1)` followed by
//! `increment("foo")` works on every backend.

use super::{CacheFrontend, DEFAULT_LIFETIME};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;

/// JSON-encoding frontend for any serde-representable value type.
pub struct DataFrontend<T> {
    lifetime: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DataFrontend<T> {
    pub fn new() -> Self {
        DataFrontend {
            lifetime: DEFAULT_LIFETIME,
            _marker: PhantomData,
        }
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        DataFrontend {
            lifetime,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for DataFrontend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DataFrontend<T> {
    fn clone(&self) -> Self {
        DataFrontend {
            lifetime: self.lifetime,
            _marker: PhantomData,
        }
    }
}

impl<T> CacheFrontend for DataFrontend<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    type Value = T;

    fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn before_store(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::SerializationError(e.to_string()))
    }

    fn after_retrieve(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
