//! Compiled references.
//!
//! A compiled reference is the resolved path/filter chain a store call runs
//! against. Whether it addresses a single document or a collection query is
//! fixed when it is compiled and carried in the type: a path that ends on a
//! document with no filters is a [`DocumentRef`]; everything else is a
//! [`QueryRef`].

use crate::filter::FilterPredicate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the root handle in rendered chains.
pub const ROOT_NAME: &str = "db";

/// One narrowing step below the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    Collection(String),
    Doc(String),
}

impl PathSegment {
    pub fn name(&self) -> &str {
        match self {
            PathSegment::Collection(name) | PathSegment::Doc(name) => name,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Collection(name) => write!(f, ".collection('{name}')"),
            PathSegment::Doc(name) => write!(f, ".doc('{name}')"),
        }
    }
}

fn join_path(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(PathSegment::name)
        .collect::<Vec<_>>()
        .join("/")
}

/// Reference to exactly one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    segments: Vec<PathSegment>,
}

impl DocumentRef {
    /// Callers guarantee the last segment is a document.
    pub(crate) fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Slash-separated store path, e.g. `users/1/posts/p`.
    pub fn path(&self) -> String {
        join_path(&self.segments)
    }

    /// The document's own id.
    pub fn id(&self) -> &str {
        self.segments.last().map(PathSegment::name).unwrap_or_default()
    }

    /// Path of the collection that holds this document.
    pub fn parent_path(&self) -> String {
        join_path(&self.segments[..self.segments.len().saturating_sub(1)])
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT_NAME)?;
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Reference to a collection, optionally narrowed by filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRef {
    segments: Vec<PathSegment>,
    filters: Vec<FilterPredicate>,
}

impl QueryRef {
    pub(crate) fn new(segments: Vec<PathSegment>, filters: Vec<FilterPredicate>) -> Self {
        Self { segments, filters }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn filters(&self) -> &[FilterPredicate] {
        &self.filters
    }

    /// Slash-separated store path of the queried collection.
    pub fn path(&self) -> String {
        join_path(&self.segments)
    }

    /// Whether the path ends on a collection. Stores only know how to query
    /// collections; a filtered document path is representable but not
    /// executable.
    pub fn targets_collection(&self) -> bool {
        matches!(self.segments.last(), Some(PathSegment::Collection(_)))
    }
}

impl fmt::Display for QueryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT_NAME)?;
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        for filter in &self.filters {
            write!(f, ".where({filter})")?;
        }
        Ok(())
    }
}

/// What a compiled reference addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Document,
    Collection,
}

/// An executable reference, fixed at compile time as a document or a query.
///
/// Created per invocation and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompiledReference {
    Document(DocumentRef),
    Query(QueryRef),
}

impl CompiledReference {
    pub fn target(&self) -> Target {
        match self {
            CompiledReference::Document(_) => Target::Document,
            CompiledReference::Query(_) => Target::Collection,
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        match self {
            CompiledReference::Document(doc) => doc.segments(),
            CompiledReference::Query(query) => query.segments(),
        }
    }

    /// Filters applied to the reference; always empty for a document.
    pub fn filters(&self) -> &[FilterPredicate] {
        match self {
            CompiledReference::Document(_) => &[],
            CompiledReference::Query(query) => query.filters(),
        }
    }

    pub fn path(&self) -> String {
        join_path(self.segments())
    }
}

impl fmt::Display for CompiledReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledReference::Document(doc) => fmt::Display::fmt(doc, f),
            CompiledReference::Query(query) => fmt::Display::fmt(query, f),
        }
    }
}
