//! The store-call lifecycle.

use crate::config::MiddlewareConfig;
use crate::error::{StoreCallError, StoreCallResult};
use crate::pipeline::Next;
use crate::reporter::{ErrorReporter, TracingReporter};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use storecall_model::{apply_schema, EntitySchema, EntityTransform};
use storecall_query::{
    compile, ActionDescriptor, ActionTypes, ConfigResult, ConfigValidationError, Method,
    SchemaDescriptor,
};
use storecall_storage::{
    BoundReference, DocumentStore, ListenerRegistration, SnapshotListener, StorageResult,
};
use storecall_types::{Action, DocumentSnapshot, Response, META_KEY, PAYLOAD_KEY};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// A named predicate over host state; returning `true` cancels the call.
pub type Bailout = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// What became of an action handed to the middleware.
#[must_use = "a pending invocation carries the outcome of the store call"]
pub enum Invocation {
    /// No descriptor: the action went downstream untouched.
    Forwarded,
    /// The bailout predicate held. Nothing was emitted and the store was not
    /// called.
    BailedOut,
    /// The request action was emitted and the one-shot store call is running
    /// on the tokio runtime. Resolves to the emitted success action. Dropping
    /// it does not cancel the call, which still ends in a success or failure
    /// action.
    Pending(BoxFuture<'static, StoreCallResult<Action>>),
    /// The request action was emitted and a subscription registered. Every
    /// delivery emits a success or failure action until the registration is
    /// removed.
    Subscribed(ListenerRegistration),
}

impl Invocation {
    /// Waits for a pending call to settle.
    ///
    /// Returns the success action for one-shot calls and `None` otherwise.
    pub async fn finish(self) -> StoreCallResult<Option<Action>> {
        match self {
            Invocation::Pending(call) => call.await.map(Some),
            _ => Ok(None),
        }
    }

    /// The subscription handle, if a subscription was registered.
    pub fn into_registration(self) -> Option<ListenerRegistration> {
        match self {
            Invocation::Subscribed(registration) => Some(registration),
            _ => None,
        }
    }

    pub fn is_forwarded(&self) -> bool {
        matches!(self, Invocation::Forwarded)
    }

    pub fn is_bailed_out(&self) -> bool {
        matches!(self, Invocation::BailedOut)
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Forwarded => f.write_str("Forwarded"),
            Invocation::BailedOut => f.write_str("BailedOut"),
            Invocation::Pending(_) => f.write_str("Pending(..)"),
            Invocation::Subscribed(registration) => {
                f.debug_tuple("Subscribed").field(registration).finish()
            }
        }
    }
}

/// Builds the actions of one invocation and sends them downstream.
struct Lifecycle {
    /// The triggering action with the marker removed.
    base: Action,
    types: ActionTypes,
    meta: Option<Value>,
    schema: Option<EntitySchema>,
    next: Arc<dyn Next>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Lifecycle {
    fn request(&self, payload: Option<Value>) {
        let mut action = self.base.clone();
        action.set_type(&self.types.request);
        action.set_optional(PAYLOAD_KEY, payload);
        action.set_optional(META_KEY, self.meta.clone());
        debug!(action_type = %self.types.request, "emitting request");
        self.next.next(action);
    }

    /// Normalizes a response into a success action. A response that does not
    /// fit the schema fails the invocation instead.
    fn succeed(&self, response: Response<DocumentSnapshot>) -> StoreCallResult<Action> {
        let documents = response.len();
        let payload = apply_schema(self.schema.as_ref(), response)
            .and_then(|payload| payload.to_value())
            .map_err(|err| self.fail(err.into()))?;

        let mut action = self.base.clone();
        action.set_type(&self.types.success);
        action.insert(PAYLOAD_KEY, payload);
        action.set_optional(META_KEY, self.meta.clone());
        debug!(action_type = %self.types.success, documents, "emitting success");
        self.next.next(action.clone());
        Ok(action)
    }

    /// Reports the error and emits a failure action; hands the error back
    /// for the caller.
    fn fail(&self, error: StoreCallError) -> StoreCallError {
        self.reporter.report(&error);
        let mut action = self.base.clone();
        action.set_type(&self.types.failure);
        action.insert(META_KEY, error.to_meta());
        self.next.next(action);
        error
    }
}

/// The store-call middleware.
///
/// Holds no state across invocations: every action is validated, compiled
/// and executed on its own.
pub struct CallStoreMiddleware {
    store: Arc<dyn DocumentStore>,
    next: Arc<dyn Next>,
    config: MiddlewareConfig,
    bailouts: HashMap<String, Bailout>,
    transforms: HashMap<String, Arc<dyn EntityTransform>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl CallStoreMiddleware {
    /// Starts building a middleware over `store` that emits into `next`.
    pub fn builder(store: Arc<dyn DocumentStore>, next: Arc<dyn Next>) -> CallStoreMiddlewareBuilder {
        CallStoreMiddlewareBuilder {
            store,
            next,
            config: MiddlewareConfig::default(),
            bailouts: HashMap::new(),
            transforms: HashMap::new(),
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn config(&self) -> &MiddlewareConfig {
        &self.config
    }

    /// Handles one action.
    ///
    /// Everything up to and including the request action happens before this
    /// returns. An invalid descriptor is returned as
    /// [`StoreCallError::Config`] with nothing emitted. One-shot calls are
    /// spawned on the current tokio runtime; without one the call is refused
    /// with [`StoreCallError::NoRuntime`], also before anything is emitted. A
    /// store subscription that cannot be registered is returned as an error
    /// after its failure action.
    pub fn handle(&self, state: &Value, action: Action) -> StoreCallResult<Invocation> {
        let Some(raw) = action.get(&self.config.marker) else {
            self.next.next(action);
            return Ok(Invocation::Forwarded);
        };

        let descriptor = ActionDescriptor::from_value(raw)?;
        let bailout = descriptor
            .bailout
            .as_deref()
            .map(|name| self.bailout(name))
            .transpose()?;
        let schema = descriptor
            .schema
            .as_ref()
            .map(|schema| self.entity_schema(schema))
            .transpose()?;

        if let Some(bailout) = bailout {
            if bailout(state) {
                debug!(action_type = %descriptor.types.request, "bailed out");
                return Ok(Invocation::BailedOut);
            }
        }

        let ActionDescriptor {
            types,
            payload,
            meta,
            query,
            ..
        } = descriptor;
        let reference = compile(&query)?;
        info!(reference = %reference, method = query.method.name(), "store call");

        let bound = BoundReference::new(Arc::clone(&self.store), reference);
        let one_shot = match one_shot(&bound, query.method) {
            Some(operation) => {
                let runtime = Handle::try_current().map_err(|_| StoreCallError::NoRuntime)?;
                Some((runtime, operation))
            }
            None => None,
        };

        let lifecycle = Arc::new(Lifecycle {
            base: action.stripped(&self.config.marker),
            types,
            meta,
            schema,
            next: Arc::clone(&self.next),
            reporter: Arc::clone(&self.reporter),
        });
        lifecycle.request(payload);

        let Some((runtime, operation)) = one_shot else {
            return subscribe(&bound, lifecycle);
        };
        let task = runtime.spawn(async move {
            match operation.await {
                Ok(response) => lifecycle.succeed(response),
                Err(err) => Err(lifecycle.fail(err.into())),
            }
        });
        Ok(Invocation::Pending(
            async move {
                task.await.unwrap_or_else(|err| {
                    warn!("store call task aborted: {}", err);
                    Err(StoreCallError::Aborted(err.to_string()))
                })
            }
            .boxed(),
        ))
    }

    fn bailout(&self, name: &str) -> ConfigResult<Bailout> {
        self.bailouts
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigValidationError::UnknownBailout(name.to_string()))
    }

    fn entity_schema(&self, descriptor: &SchemaDescriptor) -> ConfigResult<EntitySchema> {
        let mut schema = EntitySchema::new(&descriptor.name);
        if let Some(key) = &descriptor.key {
            schema = schema.with_key(key);
        }
        if let Some(name) = &descriptor.transform {
            let transform = self
                .transforms
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigValidationError::UnknownTransform(name.clone()))?;
            schema = schema.with_transform(name, transform);
        }
        Ok(schema)
    }
}

/// The store operation of a one-shot method; `None` for subscriptions.
fn one_shot(
    bound: &BoundReference,
    method: Method,
) -> Option<BoxFuture<'static, StorageResult<Response<DocumentSnapshot>>>> {
    let bound = bound.clone();
    let operation = match method {
        Method::Subscribe => return None,
        Method::Get => async move { bound.get().await }.boxed(),
        Method::Set { data, options } => async move { bound.set(data, options).await }.boxed(),
        Method::Add { data } => async move { bound.add(data).await }.boxed(),
        Method::Update { data } => async move { bound.update(data).await }.boxed(),
    };
    Some(operation)
}

/// Registers a subscription whose every delivery becomes a success or
/// failure action.
fn subscribe(bound: &BoundReference, lifecycle: Arc<Lifecycle>) -> StoreCallResult<Invocation> {
    let deliveries = Arc::clone(&lifecycle);
    // Failures are emitted and reported as they arrive; there is no caller
    // left to return them to.
    let listener: SnapshotListener = Arc::new(move |result| match result {
        Ok(response) => {
            let _ = deliveries.succeed(response);
        }
        Err(err) => {
            deliveries.fail(err.into());
        }
    });

    match bound.on_snapshot(listener) {
        Ok(registration) => Ok(Invocation::Subscribed(registration)),
        Err(err) => Err(lifecycle.fail(err.into())),
    }
}

/// Builder for [`CallStoreMiddleware`].
pub struct CallStoreMiddlewareBuilder {
    store: Arc<dyn DocumentStore>,
    next: Arc<dyn Next>,
    config: MiddlewareConfig,
    bailouts: HashMap<String, Bailout>,
    transforms: HashMap<String, Arc<dyn EntityTransform>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl CallStoreMiddlewareBuilder {
    #[must_use]
    pub fn config(mut self, config: MiddlewareConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the action property that carries descriptors.
    #[must_use]
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.config.marker = marker.into();
        self
    }

    /// Registers a bailout predicate under `name`.
    #[must_use]
    pub fn bailout(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.bailouts.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Registers an entity transform under `name`.
    #[must_use]
    pub fn transform(
        mut self,
        name: impl Into<String>,
        transform: impl EntityTransform + 'static,
    ) -> Self {
        self.transforms.insert(name.into(), Arc::new(transform));
        self
    }

    /// Replaces the default [`TracingReporter`].
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn build(self) -> CallStoreMiddleware {
        CallStoreMiddleware {
            store: self.store,
            next: self.next,
            config: self.config,
            bailouts: self.bailouts,
            transforms: self.transforms,
            reporter: self.reporter,
        }
    }
}
