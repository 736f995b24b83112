//! Core type definitions for storecall.
//!
//! This crate defines the shapes that cross every boundary of the middleware:
//! - [`Action`]: a host pipeline action, an open JSON object with a `type`
//! - [`DocumentSnapshot`] / [`QuerySnapshot`]: what the document store returns
//! - [`Response`]: a single document or an ordered collection of documents,
//!   the input of response normalization
//!
//! Nothing here performs I/O; the store, the compiler and the orchestrator
//! live in their own crates.

mod action;
mod snapshot;

pub use action::{Action, META_KEY, PAYLOAD_KEY, TYPE_KEY};
pub use snapshot::{DocumentSnapshot, QuerySnapshot, Response};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Short name of a JSON value's kind, for error messages.
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
