//! An in-memory document store for tests and local replay.

use crate::error::{StorageError, StorageResult};
use crate::store::{DocumentListener, DocumentStore, ListenerRegistration, QueryListener};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use storecall_query::{DocumentRef, FilterPredicate, QueryRef, SetOptions};
use storecall_types::{DocumentSnapshot, QuerySnapshot};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    /// Document data keyed by full path.
    documents: BTreeMap<String, Map<String, Value>>,
    document_listeners: Vec<(u64, DocumentRef, DocumentListener)>,
    query_listeners: Vec<(u64, QueryRef, QueryListener)>,
    next_listener: u64,
    fail_next: Option<StorageError>,
    operations: usize,
    /// Listener calls owed, in the order the store changed.
    queue: VecDeque<Delivery>,
    /// Set while some caller is sending queued deliveries.
    draining: bool,
}

impl Inner {
    fn snapshot(&self, path: &str) -> DocumentSnapshot {
        match self.documents.get(path) {
            Some(data) => DocumentSnapshot::new(path, data.clone()),
            None => DocumentSnapshot::missing(path),
        }
    }

    fn run_query(&self, query: &QueryRef) -> StorageResult<QuerySnapshot> {
        if !query.targets_collection() {
            return Err(StorageError::InvalidReference(format!(
                "{query} does not address a collection"
            )));
        }
        let prefix = format!("{}/", query.path());
        let mut docs = Vec::new();
        for (path, data) in self.documents.range(prefix.clone()..) {
            let Some(id) = path.strip_prefix(&prefix) else {
                break;
            };
            if id.contains('/') {
                continue;
            }
            if matches_all(query.filters(), data)? {
                docs.push(DocumentSnapshot::new(path.clone(), data.clone()));
            }
        }
        Ok(QuerySnapshot::new(docs))
    }

    /// Queues the listener calls owed after a write to `path`.
    fn notify(&mut self, path: &str) {
        let parent = path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("");
        let documents: Vec<_> = self
            .document_listeners
            .iter()
            .filter(|(_, doc, _)| doc.path() == path)
            .map(|(_, _, listener)| Delivery::Document(listener.clone(), Ok(self.snapshot(path))))
            .collect();
        let queries: Vec<_> = self
            .query_listeners
            .iter()
            .filter(|(_, query, _)| query.path() == parent)
            .map(|(_, query, listener)| Delivery::Query(listener.clone(), self.run_query(query)))
            .collect();
        self.queue.extend(documents);
        self.queue.extend(queries);
    }
}

enum Delivery {
    Document(DocumentListener, StorageResult<DocumentSnapshot>),
    Query(QueryListener, StorageResult<QuerySnapshot>),
}

impl Delivery {
    fn send(self) {
        match self {
            Delivery::Document(listener, result) => listener(result),
            Delivery::Query(listener, result) => listener(result),
        }
    }
}

/// Reads a possibly dotted field path (`address.city`).
fn field<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut value = data.get(parts.next()?)?;
    for part in parts {
        value = value.get(part)?;
    }
    Some(value)
}

/// Writes a possibly dotted field path, creating intermediate objects.
fn set_field(data: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            data.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = data
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                set_field(child, rest, value);
            }
        }
    }
}

fn matches_all(filters: &[FilterPredicate], data: &Map<String, Value>) -> StorageResult<bool> {
    for filter in filters {
        match filter.matches(field(data, &filter.field)) {
            Some(true) => {}
            Some(false) => return Ok(false),
            None => {
                return Err(StorageError::InvalidReference(format!(
                    "operator '{}' needs a list value",
                    filter.op
                )));
            }
        }
    }
    Ok(true)
}

/// A document store held entirely in memory.
///
/// Documents live in a path-ordered map, so queries return documents ordered
/// by id. Listeners receive the current state on registration and again after
/// every write that touches them.
///
/// Deliveries are queued under the same lock as the change they report and
/// sent in that order, one at a time, without the lock held. A listener may
/// call back into the store; deliveries caused by such a call are sent after
/// the current one returns. While another thread is sending, a write returns
/// as soon as its deliveries are queued.
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the operation and consumes an injected failure, if any.
    fn begin(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.operations += 1;
        match inner.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(inner),
        }
    }

    /// Writes a document directly, notifying listeners. Not counted as an
    /// operation.
    pub fn put_document(&self, path: &str, data: Map<String, Value>) {
        {
            let mut inner = self.lock();
            inner.documents.insert(path.to_string(), data);
            inner.notify(path);
        }
        self.flush();
    }

    /// Current data of a document.
    pub fn document(&self, path: &str) -> Option<Map<String, Value>> {
        self.lock().documents.get(path).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    /// Makes the next store operation fail with `error`.
    pub fn fail_next(&self, error: StorageError) {
        self.lock().fail_next = Some(error);
    }

    /// Number of store operations run so far, including failed ones.
    pub fn operation_count(&self) -> usize {
        self.lock().operations
    }

    /// Number of active subscriptions.
    pub fn listener_count(&self) -> usize {
        let inner = self.lock();
        inner.document_listeners.len() + inner.query_listeners.len()
    }

    /// Delivers an error to every active subscription.
    pub fn fail_listeners(&self, error: impl Fn() -> StorageError) {
        {
            let mut inner = self.lock();
            let documents: Vec<_> = inner
                .document_listeners
                .iter()
                .map(|(_, _, l)| Delivery::Document(l.clone(), Err(error())))
                .collect();
            let queries: Vec<_> = inner
                .query_listeners
                .iter()
                .map(|(_, _, l)| Delivery::Query(l.clone(), Err(error())))
                .collect();
            inner.queue.extend(documents);
            inner.queue.extend(queries);
        }
        self.flush();
    }

    fn write(
        &self,
        mut inner: MutexGuard<'_, Inner>,
        path: String,
        data: Map<String, Value>,
    ) -> DocumentSnapshot {
        inner.documents.insert(path.clone(), data);
        let snapshot = inner.snapshot(&path);
        inner.notify(&path);
        drop(inner);
        self.flush();
        snapshot
    }

    /// Sends queued deliveries until the queue is empty. Returns at once when
    /// another caller is already sending, which then sends ours too.
    fn flush(&self) {
        {
            let mut inner = self.lock();
            if inner.draining {
                return;
            }
            inner.draining = true;
        }
        let _reset = DrainGuard(self);
        loop {
            let delivery = {
                let mut inner = self.lock();
                let delivery = inner.queue.pop_front();
                if delivery.is_none() {
                    inner.draining = false;
                }
                delivery
            };
            match delivery {
                Some(delivery) => delivery.send(),
                None => break,
            }
        }
    }

    fn registration(&self, id: u64) -> ListenerRegistration {
        let inner = Arc::clone(&self.inner);
        ListenerRegistration::new(move || {
            let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.document_listeners.retain(|(i, _, _)| *i != id);
            inner.query_listeners.retain(|(i, _, _)| *i != id);
        })
    }
}

/// Clears the draining flag when a listener panics mid-flush.
struct DrainGuard<'a>(&'a MemoryStore);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().draining = false;
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, reference: &DocumentRef) -> StorageResult<DocumentSnapshot> {
        let inner = self.begin()?;
        Ok(inner.snapshot(&reference.path()))
    }

    async fn set_document(
        &self,
        reference: &DocumentRef,
        data: Map<String, Value>,
        options: SetOptions,
    ) -> StorageResult<DocumentSnapshot> {
        let inner = self.begin()?;
        let path = reference.path();
        let data = match (options.merge, inner.documents.get(&path)) {
            (true, Some(existing)) => {
                let mut merged = existing.clone();
                merged.extend(data);
                merged
            }
            _ => data,
        };
        Ok(self.write(inner, path, data))
    }

    async fn update_document(
        &self,
        reference: &DocumentRef,
        data: Map<String, Value>,
    ) -> StorageResult<DocumentSnapshot> {
        let inner = self.begin()?;
        let path = reference.path();
        let Some(mut updated) = inner.documents.get(&path).cloned() else {
            return Err(StorageError::NotFound(path));
        };
        for (key, value) in data {
            set_field(&mut updated, &key, value);
        }
        Ok(self.write(inner, path, updated))
    }

    async fn get_query(&self, reference: &QueryRef) -> StorageResult<QuerySnapshot> {
        let inner = self.begin()?;
        inner.run_query(reference)
    }

    async fn add_document(
        &self,
        reference: &QueryRef,
        data: Map<String, Value>,
    ) -> StorageResult<DocumentSnapshot> {
        let inner = self.begin()?;
        if !reference.targets_collection() || !reference.filters().is_empty() {
            return Err(StorageError::InvalidReference(format!(
                "cannot add a document to {reference}"
            )));
        }
        let path = format!("{}/{}", reference.path(), Uuid::new_v4().simple());
        if inner.documents.contains_key(&path) {
            return Err(StorageError::AlreadyExists(path));
        }
        Ok(self.write(inner, path, data))
    }

    fn listen_document(
        &self,
        reference: &DocumentRef,
        listener: DocumentListener,
    ) -> StorageResult<ListenerRegistration> {
        let id = {
            let mut inner = self.begin()?;
            let id = inner.next_listener;
            inner.next_listener += 1;
            let current = inner.snapshot(&reference.path());
            inner
                .document_listeners
                .push((id, reference.clone(), listener.clone()));
            inner.queue.push_back(Delivery::Document(listener, Ok(current)));
            id
        };
        self.flush();
        Ok(self.registration(id))
    }

    fn listen_query(
        &self,
        reference: &QueryRef,
        listener: QueryListener,
    ) -> StorageResult<ListenerRegistration> {
        let id = {
            let mut inner = self.begin()?;
            let current = inner.run_query(reference)?;
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner
                .query_listeners
                .push((id, reference.clone(), listener.clone()));
            inner.queue.push_back(Delivery::Query(listener, Ok(current)));
            id
        };
        self.flush();
        Ok(self.registration(id))
    }
}
