//! Response normalization.
//!
//! Turns a response into `{ entities: { <schema name>: { <id>: entity } },
//! ids: [<id>, ...] }`. A single document is handled as a collection of one.
//! `ids` follows response order and records every document, so colliding ids
//! appear twice there while `entities` keeps the last one.

use crate::{AsEntity, EntitySchema, SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use storecall_types::{json_kind, Response};

/// Entities keyed by collection name, then by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    pub entities: BTreeMap<String, BTreeMap<String, Value>>,
    pub ids: Vec<Value>,
}

impl NormalizedResult {
    /// Looks up an entity by collection name and id string.
    pub fn entity(&self, name: &str, id: &str) -> Option<&Value> {
        self.entities.get(name).and_then(|byid| byid.get(id))
    }
}

/// What a success action carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload<D> {
    /// No schema: the response, untouched.
    Raw(Response<D>),
    Normalized(NormalizedResult),
}

impl<D: Serialize> Payload<D> {
    pub fn to_value(&self) -> SchemaResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Normalizes when a schema is given, passes the response through otherwise.
pub fn apply_schema<D: AsEntity>(
    schema: Option<&EntitySchema>,
    response: Response<D>,
) -> SchemaResult<Payload<D>> {
    match schema {
        None => Ok(Payload::Raw(response)),
        Some(schema) => normalize(schema, &response).map(Payload::Normalized),
    }
}

/// Builds the keyed entity map for a response.
pub fn normalize<D: AsEntity>(
    schema: &EntitySchema,
    response: &Response<D>,
) -> SchemaResult<NormalizedResult> {
    let docs: Vec<&D> = match response {
        Response::One(doc) => vec![doc],
        Response::Many(docs) => docs.iter().collect(),
    };

    let key = schema.key();
    let mut by_id = BTreeMap::new();
    let mut ids = Vec::with_capacity(docs.len());

    for (index, doc) in docs.into_iter().enumerate() {
        let entity = Value::Object(doc.to_entity()?);
        let entity = match schema.transform() {
            Some((name, transform)) => {
                transform
                    .transform(entity)
                    .map_err(|message| SchemaError::Transform {
                        name: name.to_string(),
                        message,
                    })?
            }
            None => entity,
        };

        let id = match &entity {
            Value::Object(fields) => fields.get(key).cloned(),
            other => return Err(SchemaError::NotAnObject(json_kind(other))),
        };
        let id = match id {
            None | Some(Value::Null) => {
                return Err(SchemaError::MissingKey {
                    key: key.to_string(),
                    index,
                });
            }
            Some(id) => id,
        };
        let id_key = match &id {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(SchemaError::InvalidKey {
                    key: key.to_string(),
                    index,
                    kind: json_kind(other),
                });
            }
        };

        by_id.insert(id_key, entity);
        ids.push(id);
    }

    let mut entities = BTreeMap::new();
    entities.insert(schema.name.clone(), by_id);
    Ok(NormalizedResult { entities, ids })
}
