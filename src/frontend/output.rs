//! Raw output frontend.
//!
//! Pre-rendered content (page fragments, captured output) needs no
//! transformation, only storage and expiry. Both directions are identity:
//! the value is the UTF-8 text itself.

use super::{CacheFrontend, DEFAULT_LIFETIME};
use crate::error::{Error, Result};
use std::time::Duration;

/// Identity frontend for pre-rendered text.
#[derive(Clone, Debug)]
pub struct OutputFrontend {
    lifetime: Duration,
}

impl OutputFrontend {
    pub fn new() -> Self {
        OutputFrontend {
            lifetime: DEFAULT_LIFETIME,
        }
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        OutputFrontend { lifetime }
    }
}

impl Default for OutputFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheFrontend for OutputFrontend {
    type Value = String;

    fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn before_store(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.clone().into_bytes())
    }

    fn after_retrieve(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::DeserializationError(format!("stored output is not UTF-8: {}", e)))
    }

    fn value_from_capture(&self, captured: String) -> Result<String> {
        Ok(captured)
    }
}
