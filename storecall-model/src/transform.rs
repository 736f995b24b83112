use serde_json::Value;

/// Rewrites an entity before it is keyed.
///
/// Receives the plain entity object (document fields merged with the document
/// id) and returns the entity to store. Return `Err(message)` to fail the
/// whole normalization; nothing is partially emitted.
///
/// Closures of the right shape implement this automatically:
///
/// ```
/// use serde_json::{json, Value};
/// use storecall_model::EntityTransform;
///
/// let upper = |mut entity: Value| {
///     let name = entity["name"].as_str().unwrap_or_default().to_uppercase();
///     entity["name"] = json!(name);
///     Ok::<_, String>(entity)
/// };
/// assert_eq!(upper.transform(json!({"name": "tina"})), Ok(json!({"name": "TINA"})));
/// ```
pub trait EntityTransform: Send + Sync {
    fn transform(&self, entity: Value) -> Result<Value, String>;
}

impl<F> EntityTransform for F
where
    F: Fn(Value) -> Result<Value, String> + Send + Sync,
{
    fn transform(&self, entity: Value) -> Result<Value, String> {
        self(entity)
    }
}
