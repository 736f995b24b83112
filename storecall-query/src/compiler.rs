//! Query compilation.
//!
//! Compiling is pure structural assembly: the path `[{collection, doc}] +
//! subcollections` is folded left to right over a root [`ReferenceBuilder`],
//! each step narrowing to a collection and then, when named, to a document.
//! Filters are applied to the final reference. No store is involved.

use crate::descriptor::QueryDescriptor;
use crate::error::FilterParseError;
use crate::filter::{self, FilterPredicate};
use crate::reference::{CompiledReference, DocumentRef, PathSegment, QueryRef};
use tracing::trace;

/// A reference under construction, starting at the store root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceBuilder {
    segments: Vec<PathSegment>,
    filters: Vec<FilterPredicate>,
}

impl ReferenceBuilder {
    /// The store root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Narrows to a collection.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Collection(name.into()));
        self
    }

    /// Narrows to a document.
    #[must_use]
    pub fn doc(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Doc(name.into()));
        self
    }

    /// Narrows by a filter predicate.
    #[must_use]
    pub fn filter(mut self, predicate: FilterPredicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Fixes the reference's target: a document when the path ends on one
    /// and nothing filters it, a query otherwise.
    pub fn build(self) -> CompiledReference {
        match self.segments.last() {
            Some(PathSegment::Doc(_)) if self.filters.is_empty() => {
                CompiledReference::Document(DocumentRef::new(self.segments))
            }
            _ => CompiledReference::Query(QueryRef::new(self.segments, self.filters)),
        }
    }
}

/// Compiles a query descriptor into a reference.
///
/// Fails only when a filter expression does not parse.
pub fn compile(query: &QueryDescriptor) -> Result<CompiledReference, FilterParseError> {
    let builder = query
        .path()
        .fold(ReferenceBuilder::root(), |builder, (collection, doc)| {
            let builder = builder.collection(collection);
            match doc {
                Some(doc) => builder.doc(doc),
                None => builder,
            }
        });

    let reference = filter::parse_all(&query.filters)?
        .into_iter()
        .fold(builder, ReferenceBuilder::filter)
        .build();

    trace!(reference = %reference, "compiled query");
    Ok(reference)
}
