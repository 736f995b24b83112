//! Host pipeline actions.
//!
//! An action is an open JSON object. The only property the pipeline relies on
//! is `type`; everything else (including the marker property carrying a store
//! call descriptor) is opaque to it.

use crate::{json_kind, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property holding the action's type.
pub const TYPE_KEY: &str = "type";
/// Property holding the action's payload.
pub const PAYLOAD_KEY: &str = "payload";
/// Property holding the action's metadata.
pub const META_KEY: &str = "meta";

/// An action flowing through the host dispatch pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(Map<String, Value>);

impl Action {
    /// Creates an action with only a `type`.
    pub fn new(action_type: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(TYPE_KEY.to_string(), Value::String(action_type.into()));
        Self(fields)
    }

    /// Wraps an existing JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Converts a JSON value into an action. Only objects are actions.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(Error::NotAnObject(json_kind(&other))),
        }
    }

    /// Parses an action from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Adds a property, consuming and returning the action.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// The action's `type`, if it is a string.
    pub fn action_type(&self) -> Option<&str> {
        self.0.get(TYPE_KEY).and_then(Value::as_str)
    }

    /// Sets the action's `type`.
    pub fn set_type(&mut self, action_type: impl Into<String>) {
        self.0
            .insert(TYPE_KEY.to_string(), Value::String(action_type.into()));
    }

    /// The action's `payload`.
    pub fn payload(&self) -> Option<&Value> {
        self.0.get(PAYLOAD_KEY)
    }

    /// The action's `meta`.
    pub fn meta(&self) -> Option<&Value> {
        self.0.get(META_KEY)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Sets `key` to `value`, or removes it when `value` is `None`.
    ///
    /// An absent override still replaces whatever the action carried, so a
    /// follow-up action never leaks a stale payload or meta.
    pub fn set_optional(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(v) => {
                self.0.insert(key.to_string(), v);
            }
            None => {
                self.0.remove(key);
            }
        }
    }

    /// A copy of this action with the `marker` property removed.
    #[must_use]
    pub fn stripped(&self, marker: &str) -> Self {
        let mut fields = self.0.clone();
        fields.remove(marker);
        Self(fields)
    }

    /// All properties.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the action into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Action> for Value {
    fn from(action: Action) -> Self {
        action.into_value()
    }
}
