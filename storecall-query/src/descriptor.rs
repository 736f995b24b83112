//! Typed store-call descriptors.
//!
//! These are produced by validation ([`ActionDescriptor::from_value`]) and can
//! also be built directly in code with the `QueryDescriptor` builder methods.

use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Method names accepted on `query.method`.
pub const METHOD_NAMES: [&str; 5] = ["onSnapshot", "get", "set", "update", "add"];

/// The three action types of a store call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTypes {
    /// Emitted synchronously before the store is called.
    pub request: String,
    /// Emitted with the normalized response.
    pub success: String,
    /// Emitted with the error when the call fails.
    pub failure: String,
}

impl ActionTypes {
    pub fn new(
        request: impl Into<String>,
        success: impl Into<String>,
        failure: impl Into<String>,
    ) -> Self {
        Self {
            request: request.into(),
            success: success.into(),
            failure: failure.into(),
        }
    }
}

/// Entity schema as written in a descriptor.
///
/// `transform` is the name of a transform registered with the middleware,
/// not the transform itself; descriptors stay data-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

/// Options for a `set` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOptions {
    /// Merge into an existing document instead of replacing it.
    #[serde(default)]
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }

    /// Reads the options object of a descriptor. Unknown keys are ignored.
    pub fn from_map(options: &Map<String, Value>) -> Self {
        Self {
            merge: options.get("merge").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

/// The store operation to run, carrying exactly what it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    /// Long-lived push subscription (`onSnapshot`).
    Subscribe,
    Get,
    Set {
        data: Map<String, Value>,
        options: SetOptions,
    },
    Add {
        data: Map<String, Value>,
    },
    Update {
        data: Map<String, Value>,
    },
}

impl Method {
    /// Builds a method from its descriptor name.
    ///
    /// Returns `None` for names outside [`METHOD_NAMES`].
    pub fn from_name(
        name: &str,
        data: Map<String, Value>,
        options: SetOptions,
    ) -> Option<Self> {
        Some(match name {
            "onSnapshot" => Method::Subscribe,
            "get" => Method::Get,
            "set" => Method::Set { data, options },
            "add" => Method::Add { data },
            "update" => Method::Update { data },
            _ => return None,
        })
    }

    /// The descriptor name of this method.
    pub fn name(&self) -> &'static str {
        match self {
            Method::Subscribe => "onSnapshot",
            Method::Get => "get",
            Method::Set { .. } => "set",
            Method::Add { .. } => "add",
            Method::Update { .. } => "update",
        }
    }
}

/// One `{collection, doc}` step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl PathStep {
    pub fn new(collection: impl Into<String>, doc: Option<String>) -> Self {
        Self {
            collection: collection.into(),
            doc,
        }
    }
}

/// What to read or write, and where.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub collection: String,
    pub doc: Option<String>,
    /// Nested `{collection, doc}` steps below `doc`.
    pub subcollections: Vec<PathStep>,
    /// Raw filter expressions, applied in order.
    pub filters: Vec<String>,
    pub method: Method,
}

impl QueryDescriptor {
    pub fn new(collection: impl Into<String>, method: Method) -> Self {
        Self {
            collection: collection.into(),
            doc: None,
            subcollections: Vec::new(),
            filters: Vec::new(),
            method,
        }
    }

    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    #[must_use]
    pub fn subcollection(mut self, collection: impl Into<String>, doc: Option<&str>) -> Self {
        self.subcollections
            .push(PathStep::new(collection, doc.map(str::to_string)));
        self
    }

    #[must_use]
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filters.push(expression.into());
        self
    }

    /// The full path: the top-level step followed by every subcollection.
    pub fn path(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        std::iter::once((self.collection.as_str(), self.doc.as_deref())).chain(
            self.subcollections
                .iter()
                .map(|s| (s.collection.as_str(), s.doc.as_deref())),
        )
    }
}

/// A validated store-call descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    pub types: ActionTypes,
    pub schema: Option<SchemaDescriptor>,
    pub payload: Option<Value>,
    pub meta: Option<Value>,
    /// Name of a registered bailout predicate.
    pub bailout: Option<String>,
    pub query: QueryDescriptor,
}

impl ActionDescriptor {
    pub fn new(types: ActionTypes, query: QueryDescriptor) -> Self {
        Self {
            types,
            schema: None,
            payload: None,
            meta: None,
            bailout: None,
            query,
        }
    }

    /// Validates a JSON descriptor and converts it into its typed form.
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        crate::validate::validate(value)
    }

    #[must_use]
    pub fn with_schema(mut self, schema: SchemaDescriptor) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    #[must_use]
    pub fn with_bailout(mut self, name: impl Into<String>) -> Self {
        self.bailout = Some(name.into());
        self
    }
}
