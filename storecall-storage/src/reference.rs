//! Compiled references bound to a store.

use crate::error::{StorageError, StorageResult};
use crate::store::{DocumentStore, ListenerRegistration};
use serde_json::{Map, Value};
use std::sync::Arc;
use storecall_query::{CompiledReference, SetOptions, Target};
use storecall_types::{DocumentSnapshot, Response};
use tracing::debug;

/// Receives every response a subscription delivers, already projected by
/// target.
pub type SnapshotListener = Arc<dyn Fn(StorageResult<Response<DocumentSnapshot>>) + Send + Sync>;

/// A compiled reference together with the store it runs against.
///
/// Every operation projects its result by the reference's target: a
/// document reference yields [`Response::One`], a query yields
/// [`Response::Many`]. Operations that are not defined for the target
/// (`add` on a document, `set`/`update` on a query) fail with
/// [`StorageError::Unsupported`].
#[derive(Clone)]
pub struct BoundReference {
    store: Arc<dyn DocumentStore>,
    reference: CompiledReference,
}

impl BoundReference {
    pub fn new(store: Arc<dyn DocumentStore>, reference: CompiledReference) -> Self {
        Self { store, reference }
    }

    pub fn reference(&self) -> &CompiledReference {
        &self.reference
    }

    pub fn target(&self) -> Target {
        self.reference.target()
    }

    fn unsupported(&self, method: &'static str) -> StorageError {
        StorageError::Unsupported {
            method,
            target: self.target(),
        }
    }

    pub async fn get(&self) -> StorageResult<Response<DocumentSnapshot>> {
        debug!(reference = %self.reference, "get");
        match &self.reference {
            CompiledReference::Document(doc) => {
                self.store.get_document(doc).await.map(Response::One)
            }
            CompiledReference::Query(query) => self
                .store
                .get_query(query)
                .await
                .map(|snapshot| Response::Many(snapshot.docs)),
        }
    }

    pub async fn set(
        &self,
        data: Map<String, Value>,
        options: SetOptions,
    ) -> StorageResult<Response<DocumentSnapshot>> {
        debug!(reference = %self.reference, merge = options.merge, "set");
        match &self.reference {
            CompiledReference::Document(doc) => self
                .store
                .set_document(doc, data, options)
                .await
                .map(Response::One),
            CompiledReference::Query(_) => Err(self.unsupported("set")),
        }
    }

    pub async fn update(&self, data: Map<String, Value>) -> StorageResult<Response<DocumentSnapshot>> {
        debug!(reference = %self.reference, "update");
        match &self.reference {
            CompiledReference::Document(doc) => {
                self.store.update_document(doc, data).await.map(Response::One)
            }
            CompiledReference::Query(_) => Err(self.unsupported("update")),
        }
    }

    /// Adds a document to the referenced collection. The created document is
    /// the only element of the response.
    pub async fn add(&self, data: Map<String, Value>) -> StorageResult<Response<DocumentSnapshot>> {
        debug!(reference = %self.reference, "add");
        match &self.reference {
            CompiledReference::Document(_) => Err(self.unsupported("add")),
            CompiledReference::Query(query) => self
                .store
                .add_document(query, data)
                .await
                .map(|created| Response::Many(vec![created])),
        }
    }

    /// Registers a push subscription. `listener` is called for every
    /// delivery, successful or not, until the registration is removed.
    pub fn on_snapshot(&self, listener: SnapshotListener) -> StorageResult<ListenerRegistration> {
        debug!(reference = %self.reference, "onSnapshot");
        match &self.reference {
            CompiledReference::Document(doc) => self.store.listen_document(
                doc,
                Arc::new(move |result| listener(result.map(Response::One))),
            ),
            CompiledReference::Query(query) => self.store.listen_query(
                query,
                Arc::new(move |result| {
                    listener(result.map(|snapshot| Response::Many(snapshot.docs)))
                }),
            ),
        }
    }
}
