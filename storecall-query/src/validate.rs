//! Structural validation of JSON store-call descriptors.
//!
//! Checks run in a fixed order and stop at the first failure: action types,
//! bailout, query presence, method, collection, subcollections, then the
//! remaining optional fields. Nothing is dispatched before this passes.

use crate::descriptor::{
    ActionDescriptor, ActionTypes, Method, PathStep, QueryDescriptor, SchemaDescriptor,
    SetOptions,
};
use crate::error::{ConfigResult, ConfigValidationError};
use crate::filter;
use serde_json::{Map, Value};
use storecall_types::json_kind;

/// A JSON `null` counts as absent, like an unset property.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

pub(crate) fn validate(value: &Value) -> ConfigResult<ActionDescriptor> {
    let empty = Map::new();
    let config = value.as_object().unwrap_or(&empty);

    let types = action_types(config.get("types"))?;

    let bailout = match present(config, "bailout") {
        None => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(other) => return Err(ConfigValidationError::BailoutNotInvocable(json_kind(other))),
    };

    let query = match present(config, "query") {
        None | Some(Value::Bool(false)) => return Err(ConfigValidationError::MissingQuery),
        Some(Value::Object(query)) => query,
        Some(other) => return Err(ConfigValidationError::QueryNotObject(json_kind(other))),
    };

    let query = query_descriptor(query, &types)?;

    let schema = present(config, "schema")
        .map(schema_descriptor)
        .transpose()?;

    Ok(ActionDescriptor {
        types,
        schema,
        payload: config.get("payload").cloned(),
        meta: config.get("meta").cloned(),
        bailout,
        query,
    })
}

fn action_types(types: Option<&Value>) -> ConfigResult<ActionTypes> {
    let items = match types {
        Some(Value::Array(items)) if items.len() == 3 => items,
        Some(Value::Array(items)) => {
            return Err(ConfigValidationError::TypesNotTriple {
                found: format!("an array of {}", items.len()),
            });
        }
        Some(other) => {
            return Err(ConfigValidationError::TypesNotTriple {
                found: format!("a {}", json_kind(other)),
            });
        }
        None => {
            return Err(ConfigValidationError::TypesNotTriple {
                found: "nothing".to_string(),
            });
        }
    };

    let mut names = Vec::with_capacity(3);
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => names.push(s.clone()),
            other => {
                return Err(ConfigValidationError::TypeNotString {
                    index,
                    kind: json_kind(other),
                });
            }
        }
    }
    let [request, success, failure]: [String; 3] = names
        .try_into()
        .map_err(|_| ConfigValidationError::TypesNotTriple {
            found: "an array of 3".to_string(),
        })?;

    Ok(ActionTypes {
        request,
        success,
        failure,
    })
}

fn query_descriptor(
    query: &Map<String, Value>,
    types: &ActionTypes,
) -> ConfigResult<QueryDescriptor> {
    let method_name = match present(query, "method") {
        None => return Err(ConfigValidationError::MissingMethod),
        Some(Value::String(name)) if name.is_empty() => {
            return Err(ConfigValidationError::MissingMethod);
        }
        Some(Value::String(name)) => name.as_str(),
        Some(other) => return Err(ConfigValidationError::UnknownMethod(other.to_string())),
    };
    if !crate::METHOD_NAMES.contains(&method_name) {
        return Err(ConfigValidationError::UnknownMethod(method_name.to_string()));
    }

    let collection = match optional_string(query, "collection")? {
        Some(c) if !c.is_empty() => c,
        _ => return Err(ConfigValidationError::MissingCollection),
    };

    let subcollections = match present(query, "subcollections") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| path_step(index, item))
            .collect::<ConfigResult<Vec<_>>>()?,
        Some(_) => {
            return Err(ConfigValidationError::SubcollectionsNotSequence {
                request_type: types.request.clone(),
            });
        }
    };

    let doc = optional_string(query, "doc")?.filter(|d| !d.is_empty());
    if !subcollections.is_empty() && doc.is_none() {
        return Err(ConfigValidationError::SubcollectionsWithoutDoc);
    }
    // Only the last step may stop at a collection.
    let last = subcollections.len().saturating_sub(1);
    if let Some(index) = subcollections[..last].iter().position(|step| step.doc.is_none()) {
        return Err(ConfigValidationError::InvalidSubcollection {
            index,
            reason: "missing 'doc', required to reach the next subcollection".into(),
        });
    }

    let filters = match present(query, "where") {
        None => Vec::new(),
        Some(Value::String(expression)) => vec![expression.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(expression) => Ok(expression.clone()),
                other => Err(ConfigValidationError::InvalidWhere(format!(
                    "an array containing a {}",
                    json_kind(other)
                ))),
            })
            .collect::<ConfigResult<Vec<_>>>()?,
        Some(other) => {
            return Err(ConfigValidationError::InvalidWhere(format!(
                "a {}",
                json_kind(other)
            )));
        }
    };
    filter::parse_all(&filters)?;

    let data = match present(query, "data") {
        None => Map::new(),
        Some(Value::Object(data)) => data.clone(),
        Some(other) => return Err(ConfigValidationError::InvalidData(json_kind(other))),
    };
    let options = match present(query, "options") {
        None => SetOptions::default(),
        Some(Value::Object(options)) => SetOptions::from_map(options),
        Some(other) => return Err(ConfigValidationError::InvalidOptions(json_kind(other))),
    };

    let method = Method::from_name(method_name, data, options)
        .ok_or_else(|| ConfigValidationError::UnknownMethod(method_name.to_string()))?;

    Ok(QueryDescriptor {
        collection,
        doc,
        subcollections,
        filters,
        method,
    })
}

fn optional_string(obj: &Map<String, Value>, field: &str) -> ConfigResult<Option<String>> {
    match present(obj, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConfigValidationError::InvalidSegment {
            field: field.to_string(),
            kind: json_kind(other),
        }),
    }
}

fn path_step(index: usize, item: &Value) -> ConfigResult<PathStep> {
    let invalid = |reason: String| ConfigValidationError::InvalidSubcollection { index, reason };

    let Value::Object(step) = item else {
        return Err(invalid(format!("expected an object, got a {}", json_kind(item))));
    };
    let collection = match present(step, "collection") {
        Some(Value::String(c)) if !c.is_empty() => c.clone(),
        Some(Value::String(_)) | None => return Err(invalid("missing 'collection'".into())),
        Some(other) => {
            return Err(invalid(format!(
                "expected 'collection' to be a string, got a {}",
                json_kind(other)
            )));
        }
    };
    let doc = match present(step, "doc") {
        None => None,
        Some(Value::String(d)) => Some(d.clone()).filter(|d| !d.is_empty()),
        Some(other) => {
            return Err(invalid(format!(
                "expected 'doc' to be a string, got a {}",
                json_kind(other)
            )));
        }
    };
    Ok(PathStep { collection, doc })
}

fn schema_descriptor(value: &Value) -> ConfigResult<SchemaDescriptor> {
    let Value::Object(schema) = value else {
        return Err(ConfigValidationError::InvalidSchema(format!(
            "expected an object, got a {}",
            json_kind(value)
        )));
    };
    let name = match present(schema, "name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return Err(ConfigValidationError::InvalidSchema("missing 'name'".into())),
    };
    let key = match present(schema, "key") {
        None => None,
        Some(Value::String(key)) => Some(key.clone()),
        Some(other) => {
            return Err(ConfigValidationError::InvalidSchema(format!(
                "expected 'key' to be a string, got a {}",
                json_kind(other)
            )));
        }
    };
    let transform = match present(schema, "transform") {
        None => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(other) => {
            return Err(ConfigValidationError::InvalidSchema(format!(
                "expected 'transform' to name a registered transform, got a {}",
                json_kind(other)
            )));
        }
    };
    Ok(SchemaDescriptor {
        name,
        key,
        transform,
    })
}
