//! Document store boundary for storecall.
//!
//! The middleware never talks to a concrete database. It runs compiled
//! references against anything implementing [`DocumentStore`]:
//!
//! - [`DocumentStore`]: the capability set a backend provides (one-shot reads
//!   and writes on documents and queries, push listeners)
//! - [`BoundReference`]: a compiled reference bound to a store, exposing the
//!   five store-call operations and projecting results by target
//! - [`ListenerRegistration`]: handle that cancels a push subscription
//! - [`mock::MemoryStore`]: an in-memory store for tests and local replay
//!
//! A store is the only place a store call suspends; compiling a reference
//! never touches it.

mod error;
pub mod mock;
mod reference;
mod store;

pub use error::{StorageError, StorageResult};
pub use reference::{BoundReference, SnapshotListener};
pub use store::{DocumentListener, DocumentStore, ListenerRegistration, QueryListener};
