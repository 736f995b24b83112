//! Store responses.
//!
//! A document snapshot always knows its own id (the last path segment) and
//! may or may not hold data; reading a missing document is not an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A point-in-time read of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Document id (last segment of `path`).
    pub id: String,
    /// Full slash-separated path, e.g. `users/1/posts/p`.
    pub path: String,
    /// Document fields, `None` when the document does not exist.
    pub data: Option<Map<String, Value>>,
}

impl DocumentSnapshot {
    /// Snapshot of an existing document.
    pub fn new(path: impl Into<String>, data: Map<String, Value>) -> Self {
        let path = path.into();
        Self {
            id: last_segment(&path).to_string(),
            path,
            data: Some(data),
        }
    }

    /// Snapshot of a document that does not exist.
    pub fn missing(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: last_segment(&path).to_string(),
            path,
            data: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Reads a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(field))
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The ordered result of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySnapshot {
    pub docs: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn new(docs: Vec<DocumentSnapshot>) -> Self {
        Self { docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentSnapshot> {
        self.docs.iter()
    }
}

/// A store response as seen by normalization: one document, or an ordered
/// collection of documents.
///
/// Serializes as the document itself or as a plain array, which is what a
/// schema-less success action carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response<D> {
    Many(Vec<D>),
    One(D),
}

impl<D> Response<D> {
    /// Number of documents in the response.
    pub fn len(&self) -> usize {
        match self {
            Response::One(_) => 1,
            Response::Many(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens the response; a single document becomes a one-element list.
    pub fn into_vec(self) -> Vec<D> {
        match self {
            Response::One(doc) => vec![doc],
            Response::Many(docs) => docs,
        }
    }
}

impl<D> From<D> for Response<D> {
    fn from(doc: D) -> Self {
        Response::One(doc)
    }
}
