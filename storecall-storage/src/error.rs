//! Error types for the storage layer.

use storecall_query::Target;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors a document store can reject an operation with.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The document does not exist and the operation requires it.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document exists and the operation requires that it does not.
    #[error("document already exists: {0}")]
    AlreadyExists(String),

    /// The reference cannot be executed by this store.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// The operation is not defined for the reference's target.
    #[error("'{method}' is not supported on a {target:?} reference")]
    Unsupported { method: &'static str, target: Target },

    /// The backend failed or is unreachable.
    #[error("store backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Stable machine-readable code, carried in failure actions.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "not-found",
            StorageError::AlreadyExists(_) => "already-exists",
            StorageError::InvalidReference(_) => "invalid-argument",
            StorageError::Unsupported { .. } => "unimplemented",
            StorageError::Backend(_) => "unavailable",
            StorageError::Serialization(_) => "data-loss",
        }
    }
}
