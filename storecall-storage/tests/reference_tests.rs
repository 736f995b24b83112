use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use storecall_query::{compile, Method, QueryDescriptor, SetOptions, Target};
use storecall_storage::mock::MemoryStore;
use storecall_storage::{BoundReference, StorageError};
use storecall_types::Response;

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn bind(store: &MemoryStore, query: QueryDescriptor) -> BoundReference {
    BoundReference::new(Arc::new(store.clone()), compile(&query).unwrap())
}

fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    store.put_document("test/hi", fields(json!({"name": "mikey", "age": 5})));
    store.put_document("test/yo", fields(json!({"name": "tina", "age": 7})));
    store
}

// ── Projection by target ─────────────────────────────────────────

#[tokio::test]
async fn document_get_yields_one() {
    let store = seeded();
    let reference = bind(&store, QueryDescriptor::new("test", Method::Get).doc("hi"));

    assert_eq!(reference.target(), Target::Document);
    match reference.get().await.unwrap() {
        Response::One(snapshot) => assert_eq!(snapshot.id, "hi"),
        other => panic!("expected one document, got {other:?}"),
    }
}

#[tokio::test]
async fn collection_get_yields_many() {
    let store = seeded();
    let reference = bind(&store, QueryDescriptor::new("test", Method::Get));

    let response = reference.get().await.unwrap();
    assert!(matches!(response, Response::Many(ref docs) if docs.len() == 2));
}

#[tokio::test]
async fn filtered_document_path_is_a_query() {
    let store = seeded();
    let reference = bind(
        &store,
        QueryDescriptor::new("test", Method::Get).doc("hi").filter("age == 5"),
    );
    assert_eq!(reference.target(), Target::Collection);
    let err = reference.get().await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidReference(_)));
}

#[tokio::test]
async fn add_yields_created_document_in_many() {
    let store = seeded();
    let reference = bind(&store, QueryDescriptor::new("test", Method::Get));

    let docs = reference.add(fields(json!({"name": "new"}))).await.unwrap().into_vec();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("name"), Some(&json!("new")));
    assert_eq!(store.document_count(), 3);
}

#[tokio::test]
async fn set_and_update_return_written_document() {
    let store = seeded();
    let reference = bind(&store, QueryDescriptor::new("test", Method::Get).doc("hi"));

    let set = reference
        .set(fields(json!({"age": 6})), SetOptions::merge())
        .await
        .unwrap()
        .into_vec();
    assert_eq!(set[0].get("age"), Some(&json!(6)));

    let updated = reference.update(fields(json!({"name": "m"}))).await.unwrap().into_vec();
    assert_eq!(
        updated[0].data,
        Some(fields(json!({"name": "m", "age": 6})))
    );
}

// ── Mismatched operations ────────────────────────────────────────

#[tokio::test]
async fn add_on_document_is_unsupported() {
    let store = seeded();
    let reference = bind(&store, QueryDescriptor::new("test", Method::Get).doc("hi"));

    let err = reference.add(Map::new()).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Unsupported { method: "add", target: Target::Document }
    ));
    assert_eq!(err.code(), "unimplemented");
    assert_eq!(store.operation_count(), 0);
}

#[tokio::test]
async fn set_and_update_on_query_are_unsupported() {
    let store = seeded();
    let reference = bind(&store, QueryDescriptor::new("test", Method::Get));

    assert!(matches!(
        reference.set(Map::new(), SetOptions::default()).await,
        Err(StorageError::Unsupported { method: "set", .. })
    ));
    assert!(matches!(
        reference.update(Map::new()).await,
        Err(StorageError::Unsupported { method: "update", .. })
    ));
}

// ── Subscriptions ────────────────────────────────────────────────

#[tokio::test]
async fn on_snapshot_projects_every_delivery() {
    let store = seeded();
    let reference = bind(&store, QueryDescriptor::new("test", Method::Subscribe));
    let sizes: Arc<Mutex<Vec<usize>>> = Arc::default();
    let sink = sizes.clone();

    let registration = reference
        .on_snapshot(Arc::new(move |result| {
            sink.lock().unwrap().push(result.unwrap().len());
        }))
        .unwrap();
    store.put_document("test/zz", Map::new());
    registration.remove();
    store.put_document("test/zzz", Map::new());

    assert_eq!(*sizes.lock().unwrap(), vec![2, 3]);
}
