//! Error types for schema application.

use thiserror::Error;

/// Result type for schema application.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A response could not be normalized against a schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The entity has no value under the schema's key.
    #[error("entity {index} has no '{key}' field")]
    MissingKey { key: String, index: usize },

    /// The key field holds something that cannot index an entity map.
    #[error("entity {index} has a {kind} under '{key}', expected a string, number or boolean")]
    InvalidKey {
        key: String,
        index: usize,
        kind: &'static str,
    },

    /// A transform rejected or failed on an entity.
    #[error("transform '{name}' failed: {message}")]
    Transform { name: String, message: String },

    /// A document or transform result is not a JSON object.
    #[error("expected an entity object, got a {0}")]
    NotAnObject(&'static str),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Serialization(err.to_string())
    }
}
