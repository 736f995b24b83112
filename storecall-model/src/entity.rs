use crate::{SchemaError, SchemaResult};
use serde_json::{Map, Value};
use storecall_types::{json_kind, DocumentSnapshot};

/// Something that reads as a plain entity object.
pub trait AsEntity {
    fn to_entity(&self) -> SchemaResult<Map<String, Value>>;
}

/// `{ id, ...fields }`: a field named `id` in the document wins over the
/// document id.
impl AsEntity for DocumentSnapshot {
    fn to_entity(&self) -> SchemaResult<Map<String, Value>> {
        let mut entity = Map::new();
        entity.insert("id".to_string(), Value::String(self.id.clone()));
        if let Some(data) = &self.data {
            entity.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Ok(entity)
    }
}

impl AsEntity for Map<String, Value> {
    fn to_entity(&self) -> SchemaResult<Map<String, Value>> {
        Ok(self.clone())
    }
}

impl AsEntity for Value {
    fn to_entity(&self) -> SchemaResult<Map<String, Value>> {
        match self {
            Value::Object(fields) => Ok(fields.clone()),
            other => Err(SchemaError::NotAnObject(json_kind(other))),
        }
    }
}
