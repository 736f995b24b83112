//! Error types for descriptor validation and filter parsing.

use thiserror::Error;

/// Result type for descriptor validation.
pub type ConfigResult<T> = Result<T, ConfigValidationError>;

/// A store-call descriptor is structurally invalid.
///
/// Raised synchronously, before anything is dispatched. Never turned into an
/// action; the caller has to fix the descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("expected an array of three action types, got {found}")]
    TypesNotTriple { found: String },

    #[error("expected action types to be strings, element {index} is a {kind}")]
    TypeNotString { index: usize, kind: &'static str },

    #[error("expected bailout to be absent or the name of a registered predicate, got a {0}")]
    BailoutNotInvocable(&'static str),

    #[error("bailout predicate '{0}' is not registered")]
    UnknownBailout(String),

    #[error("no 'query' value provided in store call descriptor")]
    MissingQuery,

    #[error("expected 'query' to be an object, got a {0}")]
    QueryNotObject(&'static str),

    #[error("no 'method' value provided on 'query', available methods: {available}", available = crate::METHOD_NAMES.join(", "))]
    MissingMethod,

    #[error("unknown method '{0}', available methods: {available}", available = crate::METHOD_NAMES.join(", "))]
    UnknownMethod(String),

    #[error("no 'collection' value provided on 'query'")]
    MissingCollection,

    #[error("expected '{field}' to be a string, got a {kind}")]
    InvalidSegment { field: String, kind: &'static str },

    #[error("'subcollections' should be an array (from {request_type} call)")]
    SubcollectionsNotSequence { request_type: String },

    #[error("subcollection {index} is invalid: {reason}")]
    InvalidSubcollection { index: usize, reason: String },

    #[error("no 'doc' value provided on 'query', required in order to access subcollections")]
    SubcollectionsWithoutDoc,

    #[error("expected 'where' to be a string or an array of strings, got {0}")]
    InvalidWhere(String),

    #[error("invalid filter: {0}")]
    Filter(#[from] FilterParseError),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("entity transform '{0}' is not registered")]
    UnknownTransform(String),

    #[error("expected 'data' to be an object, got a {0}")]
    InvalidData(&'static str),

    #[error("expected 'options' to be an object, got a {0}")]
    InvalidOptions(&'static str),
}

/// A filter expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("expected 'field operator value' in '{expression}', found {found} tokens")]
    TokenCount { expression: String, found: usize },

    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),
}
