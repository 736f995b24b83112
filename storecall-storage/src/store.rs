//! The document store capability trait.

use crate::error::StorageResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use storecall_query::{DocumentRef, QueryRef, SetOptions};
use storecall_types::{DocumentSnapshot, QuerySnapshot};

/// Receives every snapshot (or error) a document subscription delivers.
pub type DocumentListener = Arc<dyn Fn(StorageResult<DocumentSnapshot>) + Send + Sync>;

/// Receives every snapshot (or error) a query subscription delivers.
pub type QueryListener = Arc<dyn Fn(StorageResult<QuerySnapshot>) + Send + Sync>;

/// A document-oriented store.
///
/// Document operations take a [`DocumentRef`], collection operations a
/// [`QueryRef`]; which one a store call uses is fixed when its reference is
/// compiled. Writes resolve to the document as it reads after the write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one document. A missing document is a snapshot without data,
    /// not an error.
    async fn get_document(&self, reference: &DocumentRef) -> StorageResult<DocumentSnapshot>;

    /// Creates or overwrites a document, or merges into it with
    /// `options.merge`.
    async fn set_document(
        &self,
        reference: &DocumentRef,
        data: Map<String, Value>,
        options: SetOptions,
    ) -> StorageResult<DocumentSnapshot>;

    /// Merges fields into an existing document. Fails with `NotFound` if the
    /// document does not exist.
    async fn update_document(
        &self,
        reference: &DocumentRef,
        data: Map<String, Value>,
    ) -> StorageResult<DocumentSnapshot>;

    /// Runs a query, returning matching documents in a stable order.
    async fn get_query(&self, reference: &QueryRef) -> StorageResult<QuerySnapshot>;

    /// Adds a document with a generated id to the queried collection.
    async fn add_document(
        &self,
        reference: &QueryRef,
        data: Map<String, Value>,
    ) -> StorageResult<DocumentSnapshot>;

    /// Subscribes to a document. The listener may be called any number of
    /// times until the returned registration is removed.
    fn listen_document(
        &self,
        reference: &DocumentRef,
        listener: DocumentListener,
    ) -> StorageResult<ListenerRegistration>;

    /// Subscribes to a query.
    fn listen_query(
        &self,
        reference: &QueryRef,
        listener: QueryListener,
    ) -> StorageResult<ListenerRegistration>;
}

/// Cancels a subscription when removed.
///
/// Dropping a registration does not cancel anything; subscriptions live until
/// [`remove`](Self::remove) is called.
pub struct ListenerRegistration {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A registration with nothing to cancel.
    pub fn noop() -> Self {
        Self { unsubscribe: None }
    }

    /// Stops further deliveries.
    pub fn remove(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
