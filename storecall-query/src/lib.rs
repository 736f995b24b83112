//! Declarative store-call descriptors and their compilation.
//!
//! A store call arrives as data: a JSON descriptor naming three action types,
//! an optional entity schema and a query (collection/document path, filter
//! expressions, method). This crate turns that data into something executable
//! without touching any store:
//!
//! - **Validation** ([`ActionDescriptor::from_value`]): structural checks that
//!   fail fast with a [`ConfigValidationError`] and yield typed descriptors
//! - **Filter parsing** ([`FilterPredicate`]): `"field op value"` expressions
//!   with numeric coercion of the value token
//! - **Compilation** ([`compile`]): folds the path over a root reference and
//!   applies filters, producing a [`CompiledReference`] tagged as a single
//!   document or a collection query
//!
//! # Example
//!
//! ```
//! use storecall_query::{compile, Method, QueryDescriptor, Target};
//!
//! let query = QueryDescriptor::new("users", Method::Get).filter("age >= 21");
//! let reference = compile(&query).unwrap();
//!
//! assert_eq!(reference.target(), Target::Collection);
//! assert_eq!(reference.to_string(), "db.collection('users').where(age,>=,21)");
//! ```

mod compiler;
mod descriptor;
mod error;
pub mod filter;
mod reference;
mod validate;

pub use compiler::{compile, ReferenceBuilder};
pub use descriptor::{
    ActionDescriptor, ActionTypes, Method, PathStep, QueryDescriptor, SchemaDescriptor,
    SetOptions, METHOD_NAMES,
};
pub use error::{ConfigResult, ConfigValidationError, FilterParseError};
pub use filter::{FilterOp, FilterPredicate, FilterValue};
pub use reference::{CompiledReference, DocumentRef, PathSegment, QueryRef, Target, ROOT_NAME};
