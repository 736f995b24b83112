use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use storecall_middleware::pipeline::mock::RecordingNext;
use storecall_middleware::reporter::mock::RecordingReporter;
use storecall_middleware::{
    CallStoreMiddleware, CallStoreMiddlewareBuilder, Invocation, StoreCallError,
};
use storecall_query::ConfigValidationError;
use storecall_storage::mock::MemoryStore;
use storecall_storage::StorageError;
use storecall_types::Action;

struct Harness {
    store: MemoryStore,
    next: Arc<RecordingNext>,
    reporter: Arc<RecordingReporter>,
    middleware: CallStoreMiddleware,
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn harness() -> Harness {
    harness_with(|builder| builder)
}

fn harness_with(
    configure: impl FnOnce(CallStoreMiddlewareBuilder) -> CallStoreMiddlewareBuilder,
) -> Harness {
    let store = MemoryStore::new();
    store.put_document("users/1", fields(json!({"name": "tina", "age": 30})));
    store.put_document("users/2", fields(json!({"name": "mikey", "age": 5})));
    store.put_document("users/1/posts/p", fields(json!({"title": "hello"})));

    let next = Arc::new(RecordingNext::new());
    let reporter = Arc::new(RecordingReporter::new());
    let builder = CallStoreMiddleware::builder(Arc::new(store.clone()), next.clone())
        .reporter(reporter.clone());
    let middleware = configure(builder).build();

    Harness {
        store,
        next,
        reporter,
        middleware,
    }
}

fn call(descriptor: Value) -> Action {
    Action::new("FETCH").with("CALL_STORE", descriptor)
}

fn descriptor(query: Value) -> Value {
    json!({ "types": ["REQ", "OK", "FAIL"], "query": query })
}

fn state() -> Value {
    json!({ "users": { "loaded": false } })
}

// ── Pass-through ─────────────────────────────────────────────────

#[tokio::test]
async fn unmarked_action_is_forwarded_untouched() {
    let h = harness();
    let action = Action::new("OTHER").with("payload", json!(1));

    let invocation = h.middleware.handle(&state(), action.clone()).unwrap();

    assert!(invocation.is_forwarded());
    assert_eq!(h.next.actions(), vec![action]);
    assert_eq!(h.store.operation_count(), 0);
}

// ── Validation ───────────────────────────────────────────────────

#[tokio::test]
async fn invalid_descriptor_fails_before_anything_is_emitted() {
    let h = harness();

    let err = h
        .middleware
        .handle(&state(), call(json!({ "types": ["REQ", "OK", "FAIL"] })))
        .unwrap_err();

    assert!(matches!(
        err,
        StoreCallError::Config(ConfigValidationError::MissingQuery)
    ));
    assert!(err.is_config());
    assert!(h.next.is_empty());
    assert!(h.reporter.is_empty());
    assert_eq!(h.store.operation_count(), 0);
}

#[tokio::test]
async fn two_action_types_are_rejected() {
    let h = harness();
    let err = h
        .middleware
        .handle(
            &state(),
            call(json!({ "types": ["REQ", "OK"], "query": {"collection": "users", "method": "get"} })),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StoreCallError::Config(ConfigValidationError::TypesNotTriple { .. })
    ));
    assert!(h.next.is_empty());
}

#[tokio::test]
async fn subcollection_below_a_collection_is_rejected() {
    let h = harness();
    let d = descriptor(json!({
        "collection": "users", "doc": "1",
        "subcollections": [{"collection": "posts"}, {"collection": "comments", "doc": "c"}],
        "method": "get"
    }));

    let err = h.middleware.handle(&state(), call(d)).unwrap_err();

    assert!(matches!(
        err,
        StoreCallError::Config(ConfigValidationError::InvalidSubcollection { index: 0, .. })
    ));
    assert!(h.next.is_empty());
    assert_eq!(h.store.operation_count(), 0);
}

#[tokio::test]
async fn unregistered_bailout_is_a_config_error() {
    let h = harness();
    let mut d = descriptor(json!({"collection": "users", "method": "get"}));
    d["bailout"] = json!("cached");

    let err = h.middleware.handle(&state(), call(d)).unwrap_err();

    assert!(matches!(
        err,
        StoreCallError::Config(ConfigValidationError::UnknownBailout(ref name)) if name == "cached"
    ));
    assert!(h.next.is_empty());
}

#[tokio::test]
async fn unregistered_transform_is_a_config_error() {
    let h = harness();
    let mut d = descriptor(json!({"collection": "users", "method": "get"}));
    d["schema"] = json!({"name": "users", "transform": "missing"});

    let err = h.middleware.handle(&state(), call(d)).unwrap_err();
    assert!(matches!(
        err,
        StoreCallError::Config(ConfigValidationError::UnknownTransform(_))
    ));
}

// ── Bailout ──────────────────────────────────────────────────────

#[tokio::test]
async fn bailout_suppresses_everything() {
    let h = harness_with(|b| b.bailout("loaded", |state: &Value| state["users"]["loaded"] == true));
    let mut d = descriptor(json!({"collection": "users", "method": "get"}));
    d["bailout"] = json!("loaded");

    let invocation = h
        .middleware
        .handle(&json!({"users": {"loaded": true}}), call(d))
        .unwrap();

    assert!(invocation.is_bailed_out());
    assert_eq!(invocation.finish().await.unwrap(), None);
    assert!(h.next.is_empty());
    assert_eq!(h.store.operation_count(), 0);
}

#[tokio::test]
async fn bailout_returning_false_proceeds() {
    let h = harness_with(|b| b.bailout("loaded", |state: &Value| state["users"]["loaded"] == true));
    let mut d = descriptor(json!({"collection": "users", "method": "get"}));
    d["bailout"] = json!("loaded");

    let invocation = h.middleware.handle(&state(), call(d)).unwrap();
    invocation.finish().await.unwrap();

    assert_eq!(h.next.types(), vec!["REQ", "OK"]);
}

// ── Request action ───────────────────────────────────────────────

#[tokio::test]
async fn request_is_emitted_before_the_store_is_called() {
    let h = harness();
    let invocation = h
        .middleware
        .handle(&state(), call(descriptor(json!({"collection": "users", "method": "get"}))))
        .unwrap();

    assert_eq!(h.next.types(), vec!["REQ"]);
    assert_eq!(h.store.operation_count(), 0);

    invocation.finish().await.unwrap();
    assert_eq!(h.next.types(), vec!["REQ", "OK"]);
    assert_eq!(h.store.operation_count(), 1);
}

#[tokio::test]
async fn request_merges_over_the_triggering_action() {
    let h = harness();
    let mut d = descriptor(json!({"collection": "users", "method": "get"}));
    d["payload"] = json!({"page": 1});
    d["meta"] = json!({"source": "list"});
    let action = call(d).with("extra", json!("kept"));

    let _ = h.middleware.handle(&state(), action).unwrap();

    assert_eq!(
        h.next.actions()[0].clone().into_value(),
        json!({
            "type": "REQ",
            "payload": {"page": 1},
            "meta": {"source": "list"},
            "extra": "kept"
        })
    );
}

#[tokio::test]
async fn absent_payload_and_meta_are_not_leaked() {
    let h = harness();
    let action = call(descriptor(json!({"collection": "users", "doc": "1", "method": "get"})))
        .with("payload", json!("stale"))
        .with("meta", json!("stale"));

    let invocation = h.middleware.handle(&state(), action).unwrap();
    let success = invocation.finish().await.unwrap().unwrap();

    let request = &h.next.actions()[0];
    assert!(!request.contains("payload"));
    assert!(!request.contains("meta"));
    assert!(!success.contains("meta"));
}

#[tokio::test]
async fn custom_marker() {
    let h = harness_with(|b| b.marker("FIRESTORE"));
    let d = descriptor(json!({"collection": "users", "method": "get"}));

    let ignored = h.middleware.handle(&state(), call(d.clone())).unwrap();
    assert!(ignored.is_forwarded());

    let action = Action::new("FETCH").with("FIRESTORE", d);
    h.middleware.handle(&state(), action).unwrap().finish().await.unwrap();

    let actions = h.next.actions();
    assert_eq!(actions.len(), 3);
    assert!(actions.iter().skip(1).all(|a| !a.contains("FIRESTORE")));
}

// ── One-shot success ─────────────────────────────────────────────

#[tokio::test]
async fn get_document_with_schema() {
    let h = harness();
    let mut d = descriptor(json!({"collection": "users", "doc": "1", "method": "get"}));
    d["schema"] = json!({"name": "users"});
    d["meta"] = json!({"m": true});

    let success = h
        .middleware
        .handle(&state(), call(d))
        .unwrap()
        .finish()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        success.into_value(),
        json!({
            "type": "OK",
            "payload": {
                "entities": {"users": {"1": {"id": "1", "name": "tina", "age": 30}}},
                "ids": ["1"]
            },
            "meta": {"m": true}
        })
    );
    assert_eq!(h.next.last().unwrap().action_type(), Some("OK"));
}

#[tokio::test]
async fn get_collection_without_schema_passes_documents_through() {
    let h = harness();
    let success = h
        .middleware
        .handle(&state(), call(descriptor(json!({"collection": "users", "method": "get"}))))
        .unwrap()
        .finish()
        .await
        .unwrap()
        .unwrap();

    let payload = success.payload().unwrap();
    assert_eq!(payload.as_array().map(Vec::len), Some(2));
    assert_eq!(payload[0]["id"], json!("1"));
    assert_eq!(payload[1]["data"]["name"], json!("mikey"));
}

#[tokio::test]
async fn where_filters_narrow_the_collection() {
    let h = harness();
    let mut d = descriptor(json!({"collection": "users", "method": "get", "where": ["age >= 18", "name == tina"]}));
    d["schema"] = json!({"name": "users"});

    let success = h
        .middleware
        .handle(&state(), call(d))
        .unwrap()
        .finish()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(success.payload().unwrap()["ids"], json!(["1"]));
}

#[tokio::test]
async fn subcollection_query() {
    let h = harness();
    let mut d = descriptor(json!({
        "collection": "users", "doc": "1",
        "subcollections": [{"collection": "posts"}],
        "method": "get"
    }));
    d["schema"] = json!({"name": "posts"});

    let success = h
        .middleware
        .handle(&state(), call(d))
        .unwrap()
        .finish()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        success.payload().unwrap()["entities"]["posts"]["p"]["title"],
        json!("hello")
    );
}

#[tokio::test]
async fn set_with_merge_then_update() {
    let h = harness();
    let set = descriptor(json!({
        "collection": "users", "doc": "2", "method": "set",
        "data": {"age": 6}, "options": {"merge": true}
    }));
    h.middleware.handle(&state(), call(set)).unwrap().finish().await.unwrap();
    assert_eq!(
        h.store.document("users/2"),
        Some(fields(json!({"name": "mikey", "age": 6})))
    );

    let update = descriptor(json!({
        "collection": "users", "doc": "2", "method": "update", "data": {"name": "mike"}
    }));
    let success = h
        .middleware
        .handle(&state(), call(update))
        .unwrap()
        .finish()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(success.payload().unwrap()["data"], json!({"name": "mike", "age": 6}));
    assert_eq!(h.next.types(), vec!["REQ", "OK", "REQ", "OK"]);
}

#[tokio::test]
async fn add_with_transform() {
    let h = harness_with(|b| {
        b.transform("stamp", |mut entity: Value| {
            entity["stamped"] = json!(true);
            Ok::<_, String>(entity)
        })
    });
    let mut d = descriptor(json!({"collection": "users", "method": "add", "data": {"name": "dee"}}));
    d["schema"] = json!({"name": "users", "transform": "stamp"});

    let success = h
        .middleware
        .handle(&state(), call(d))
        .unwrap()
        .finish()
        .await
        .unwrap()
        .unwrap();

    let payload = success.payload().unwrap();
    let id = payload["ids"][0].as_str().unwrap().to_string();
    assert_eq!(payload["entities"]["users"][&id]["stamped"], json!(true));
    assert_eq!(h.store.document(&format!("users/{id}")), Some(fields(json!({"name": "dee"}))));
}

// ── Runtime ──────────────────────────────────────────────────────

#[tokio::test]
async fn dropped_pending_call_still_settles() {
    let h = harness();
    let d = descriptor(json!({
        "collection": "users", "doc": "1", "method": "set", "data": {"name": "tee"}
    }));

    drop(h.middleware.handle(&state(), call(d)).unwrap());
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.next.types(), vec!["REQ", "OK"]);
    assert_eq!(h.store.document("users/1"), Some(fields(json!({"name": "tee"}))));
}

#[tokio::test]
async fn dropped_failing_call_still_emits_its_failure() {
    let h = harness();
    h.store.fail_next(StorageError::Backend("offline".into()));

    drop(
        h.middleware
            .handle(&state(), call(descriptor(json!({"collection": "users", "method": "get"}))))
            .unwrap(),
    );
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.next.types(), vec!["REQ", "FAIL"]);
    assert_eq!(h.reporter.codes(), vec!["unavailable"]);
}

#[test]
fn one_shot_call_outside_a_runtime_is_refused_before_the_request() {
    let h = harness();

    let err = h
        .middleware
        .handle(&state(), call(descriptor(json!({"collection": "users", "method": "get"}))))
        .unwrap_err();

    assert!(matches!(err, StoreCallError::NoRuntime));
    assert_eq!(err.code(), "no-runtime");
    assert!(h.next.is_empty());
    assert!(h.reporter.is_empty());
    assert_eq!(h.store.operation_count(), 0);
}

#[test]
fn subscription_outside_a_runtime_is_registered() {
    let h = harness();
    let d = descriptor(json!({"collection": "users", "doc": "2", "method": "onSnapshot"}));

    let registration = h
        .middleware
        .handle(&state(), call(d))
        .unwrap()
        .into_registration()
        .unwrap();

    assert_eq!(h.next.types(), vec!["REQ", "OK"]);
    registration.remove();
}

// ── Failures ─────────────────────────────────────────────────────

#[tokio::test]
async fn store_failure_emits_one_failure_and_rejects() {
    let h = harness();
    h.store.fail_next(StorageError::Backend("offline".into()));
    let action = call(descriptor(json!({"collection": "users", "method": "get"})))
        .with("payload", json!({"kept": true}));

    let err = h
        .middleware
        .handle(&state(), action)
        .unwrap()
        .finish()
        .await
        .unwrap_err();

    assert!(matches!(err, StoreCallError::Storage(StorageError::Backend(_))));
    assert_eq!(h.next.types(), vec!["REQ", "FAIL"]);
    assert_eq!(
        h.next.last().unwrap().into_value(),
        json!({
            "type": "FAIL",
            "payload": {"kept": true},
            "meta": {"code": "unavailable", "message": "store backend error: offline"}
        })
    );
    assert_eq!(h.reporter.codes(), vec!["unavailable"]);
}

#[tokio::test]
async fn update_of_missing_document_fails() {
    let h = harness();
    let d = descriptor(json!({"collection": "users", "doc": "9", "method": "update", "data": {"a": 1}}));

    let err = h
        .middleware
        .handle(&state(), call(d))
        .unwrap()
        .finish()
        .await
        .unwrap_err();

    assert_eq!(err.code(), "not-found");
    assert_eq!(h.next.types(), vec!["REQ", "FAIL"]);
}

#[tokio::test]
async fn add_on_a_document_fails_through_the_failure_path() {
    let h = harness();
    let d = descriptor(json!({"collection": "users", "doc": "1", "method": "add", "data": {}}));

    let err = h
        .middleware
        .handle(&state(), call(d))
        .unwrap()
        .finish()
        .await
        .unwrap_err();

    assert_eq!(err.code(), "unimplemented");
    assert_eq!(h.next.types(), vec!["REQ", "FAIL"]);
    assert_eq!(h.store.operation_count(), 0);
}

#[tokio::test]
async fn schema_mismatch_fails_without_success() {
    let h = harness();
    let mut d = descriptor(json!({"collection": "users", "method": "get"}));
    d["schema"] = json!({"name": "users", "key": "_id"});

    let err = h
        .middleware
        .handle(&state(), call(d))
        .unwrap()
        .finish()
        .await
        .unwrap_err();

    assert!(matches!(err, StoreCallError::Schema(_)));
    assert_eq!(h.next.types(), vec!["REQ", "FAIL"]);
    assert_eq!(h.reporter.codes(), vec!["schema-mismatch"]);
}

// ── Subscriptions ────────────────────────────────────────────────

#[tokio::test]
async fn subscription_emits_for_every_delivery() {
    let h = harness();
    let mut d = descriptor(json!({"collection": "users", "method": "onSnapshot"}));
    d["schema"] = json!({"name": "users"});

    let invocation = h.middleware.handle(&state(), call(d)).unwrap();
    let registration = invocation.into_registration().unwrap();

    h.store.put_document("users/3", fields(json!({"name": "cy"})));
    h.store.fail_listeners(|| StorageError::Backend("dropped".into()));

    assert_eq!(h.next.types(), vec!["REQ", "OK", "OK", "FAIL"]);
    let actions = h.next.actions();
    assert_eq!(actions[1].payload().unwrap()["ids"], json!(["1", "2"]));
    assert_eq!(actions[2].payload().unwrap()["ids"], json!(["1", "2", "3"]));
    assert_eq!(h.reporter.len(), 1);

    registration.remove();
    h.store.put_document("users/4", Map::new());
    assert_eq!(h.next.len(), 4);
}

#[tokio::test]
async fn document_subscription_delivers_single_documents() {
    let h = harness();
    let d = descriptor(json!({"collection": "users", "doc": "2", "method": "onSnapshot"}));

    let invocation = h.middleware.handle(&state(), call(d)).unwrap();
    assert!(matches!(invocation, Invocation::Subscribed(_)));

    h.store.put_document("users/2", fields(json!({"name": "m"})));

    let actions = h.next.actions();
    assert_eq!(actions.len(), 3);
    assert_eq!(actions[2].payload().unwrap()["data"], json!({"name": "m"}));
}

#[tokio::test]
async fn failed_registration_is_returned_after_its_failure_action() {
    let h = harness();
    h.store.fail_next(StorageError::Backend("offline".into()));
    let d = descriptor(json!({"collection": "users", "method": "onSnapshot"}));

    let err = h.middleware.handle(&state(), call(d)).unwrap_err();

    assert!(!err.is_config());
    assert_eq!(h.next.types(), vec!["REQ", "FAIL"]);
}
