//! Error types for store calls.

use serde_json::{json, Value};
use storecall_model::SchemaError;
use storecall_query::{ConfigValidationError, FilterParseError};
use storecall_storage::StorageError;
use thiserror::Error;

/// Result type for store calls.
pub type StoreCallResult<T> = Result<T, StoreCallError>;

/// Why a store call did not complete.
#[derive(Debug, Error)]
pub enum StoreCallError {
    /// The descriptor is invalid. Raised before anything is emitted.
    #[error(transparent)]
    Config(#[from] ConfigValidationError),

    /// The store rejected the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The response could not be normalized.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A one-shot call was handled outside a tokio runtime. Raised before
    /// anything is emitted.
    #[error("one-shot store calls need a running tokio runtime")]
    NoRuntime,

    /// The task running a one-shot call ended without a result.
    #[error("store call task aborted: {0}")]
    Aborted(String),
}

impl From<FilterParseError> for StoreCallError {
    fn from(err: FilterParseError) -> Self {
        StoreCallError::Config(err.into())
    }
}

impl StoreCallError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            StoreCallError::Config(_) => "invalid-descriptor",
            StoreCallError::Storage(err) => err.code(),
            StoreCallError::Schema(_) => "schema-mismatch",
            StoreCallError::NoRuntime => "no-runtime",
            StoreCallError::Aborted(_) => "aborted",
        }
    }

    /// Whether the descriptor itself was rejected.
    pub fn is_config(&self) -> bool {
        matches!(self, StoreCallError::Config(_))
    }

    /// The `meta` carried by a failure action.
    pub fn to_meta(&self) -> Value {
        json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}
