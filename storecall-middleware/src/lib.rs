//! Store-call middleware for a host dispatch pipeline.
//!
//! Actions carrying a store-call descriptor under the configured marker
//! property are turned into document store calls wrapped in a three-phase
//! lifecycle:
//!
//! 1. the descriptor is validated (nothing is emitted on failure)
//! 2. an optional bailout predicate over host state may cancel the call
//! 3. a request action is emitted synchronously
//! 4. the compiled reference runs against the store
//! 5. a success action with the normalized response, or a failure action
//!    with the error, is emitted; subscriptions emit a success action for
//!    every delivery
//!
//! Every other action is forwarded untouched.

mod config;
mod error;
mod middleware;
pub mod pipeline;
pub mod reporter;

pub use config::{MiddlewareConfig, DEFAULT_MARKER};
pub use error::{StoreCallError, StoreCallResult};
pub use middleware::{Bailout, CallStoreMiddleware, CallStoreMiddlewareBuilder, Invocation};
pub use pipeline::Next;
pub use reporter::{ErrorReporter, TracingReporter};
