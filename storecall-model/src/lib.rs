//! Entity model and response normalization for storecall.
//!
//! Defines how raw store responses become flat, keyed entity collections:
//! - [`EntitySchema`]: entity collection name, id key and optional transform
//! - [`EntityTransform`]: optional per-entity rewrite, registered by name
//! - [`AsEntity`]: anything that can be read as a plain entity object
//! - [`normalize`] / [`apply_schema`]: response → `{entities, ids}`
//!
//! A success action carries either the normalized result or, when no schema
//! was given, the response exactly as the store produced it.

mod entity;
mod error;
mod normalize;
mod schema;
mod transform;

pub use entity::AsEntity;
pub use error::{SchemaError, SchemaResult};
pub use normalize::{apply_schema, normalize, NormalizedResult, Payload};
pub use schema::{EntitySchema, DEFAULT_KEY};
pub use transform::EntityTransform;
