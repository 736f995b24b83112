//! Scripted replay of store-call actions.
//!
//! A script seeds an in-memory store, fixes the host state, and lists the
//! actions to dispatch:
//!
//! ```json
//! {
//!   "documents": { "users/1": { "name": "tina" } },
//!   "state": { "users": { "loaded": false } },
//!   "bailouts": { "loaded": "/users/loaded" },
//!   "actions": [ { "type": "FETCH", "CALL_STORE": { ... } } ]
//! }
//! ```
//!
//! A bailout is declared as a JSON pointer into the host state; it holds when
//! the value there is truthy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use storecall_middleware::pipeline::mock::RecordingNext;
use storecall_middleware::{CallStoreMiddleware, Invocation, MiddlewareConfig};
use storecall_storage::mock::MemoryStore;
use storecall_types::Action;
use tracing::{debug, warn};

/// A replay script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Documents to seed, keyed by path.
    #[serde(default)]
    pub documents: BTreeMap<String, Map<String, Value>>,
    /// Host state the bailouts are evaluated against.
    #[serde(default)]
    pub state: Value,
    /// Bailout names mapped to JSON pointers into `state`.
    #[serde(default)]
    pub bailouts: BTreeMap<String, String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Script {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// What a replay produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replay {
    /// Every action that reached the end of the pipeline, in order.
    pub emitted: Vec<Action>,
    /// Error messages of invocations that were rejected.
    pub rejected: Vec<String>,
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Runs every action of `script` in order.
///
/// One-shot calls are awaited before the next action is dispatched.
/// Subscriptions stay registered until the script ends, so later writes show
/// up as further deliveries.
pub async fn run(script: &Script, config: MiddlewareConfig) -> Replay {
    let store = MemoryStore::new();
    for (path, data) in &script.documents {
        store.put_document(path, data.clone());
    }

    let next = Arc::new(RecordingNext::new());
    let mut builder = CallStoreMiddleware::builder(Arc::new(store.clone()), next.clone())
        .config(config);
    for (name, pointer) in &script.bailouts {
        let pointer = pointer.clone();
        builder = builder.bailout(name.clone(), move |state: &Value| {
            truthy(state.pointer(&pointer))
        });
    }
    let middleware = builder.build();

    let mut rejected = Vec::new();
    let mut registrations = Vec::new();
    for (index, action) in script.actions.iter().enumerate() {
        debug!(index, action_type = action.action_type().unwrap_or_default(), "dispatching");
        let outcome = match middleware.handle(&script.state, action.clone()) {
            Ok(Invocation::Subscribed(registration)) => {
                registrations.push(registration);
                Ok(None)
            }
            Ok(invocation) => invocation.finish().await,
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            warn!(index, code = err.code(), error = %err, "action rejected");
            rejected.push(err.to_string());
        }
    }

    registrations.into_iter().for_each(|r| r.remove());
    Replay {
        emitted: next.take(),
        rejected,
    }
}
