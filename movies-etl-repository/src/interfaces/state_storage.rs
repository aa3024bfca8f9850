//! Key-value storage for stream watermarks.

use async_trait::async_trait;

use crate::errors::StateError;

/// Whole-field get/set of opaque string values.
///
/// Implementations do not interpret the values; parsing and the sentinel
/// fallback belong to the caller.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StateError>;

    /// Overwrite the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StateError>;
}
