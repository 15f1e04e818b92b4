//! Error types for the object store client.

use thiserror::Error;

/// Result type alias for object store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key does not exist. Kept apart from backend failures so callers
    /// can tell "doesn't exist" from "broke".
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("failed to configure object store: {0}")]
    Config(String),

    #[error("object store error: {0}")]
    Backend(#[source] object_store::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
