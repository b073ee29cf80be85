//! Type-keyed intent routing.
//!
//! Every intent payload type has at most one handler. Routes are kept in a
//! table keyed by the payload's [`TypeId`], filled explicitly at startup by
//! [`IntentRouter::register`]. Registering a second handler for the same type
//! replaces the first.
//!
//! A missing route is not a failure: [`IntentRouter::execute`] logs a warning
//! and returns [`DispatchOutcome::Unrouted`]. A handler failure is always
//! returned to the caller as a [`DispatchError`].

use crate::errors::{DispatchError, DispatchResult, HandlerError, HandlerResult};
use crate::sync::RwLockRecovery;
use crate::types::TraceId;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// A payload type that can be carried by an [`Intent`].
///
/// `NAME` is used in logs and errors; it should be the type's own name.
pub trait IntentPayload: Send + 'static {
    /// Human readable name of the intent.
    const NAME: &'static str;
}

/// A single-destination request to do something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent<T> {
    payload: T,
    trace_id: Option<TraceId>,
}

impl<T> Intent<T> {
    /// Wraps a payload with no trace id.
    pub const fn new(payload: T) -> Self {
        Self {
            payload,
            trace_id: None,
        }
    }

    /// Attaches the trace id of the request that caused this intent.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// The payload.
    pub const fn payload(&self) -> &T {
        &self.payload
    }

    /// The trace id, if any.
    pub const fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Splits the intent into its payload and trace id.
    pub fn into_parts(self) -> (T, Option<TraceId>) {
        (self.payload, self.trace_id)
    }
}

/// Handles intents carrying `T`.
#[async_trait]
pub trait IntentHandler<T: IntentPayload>: Send + Sync {
    /// Performs the intent.
    async fn handle(&self, intent: Intent<T>) -> HandlerResult;
}

/// Adapts an async closure into an [`IntentHandler`].
struct FnHandler<F>(F);

#[async_trait]
impl<T, F, Fut> IntentHandler<T> for FnHandler<F>
where
    T: IntentPayload,
    F: Fn(Intent<T>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, intent: Intent<T>) -> HandlerResult {
        (self.0)(intent).await
    }
}

#[async_trait]
impl<T, H> IntentHandler<T> for Arc<H>
where
    T: IntentPayload,
    H: IntentHandler<T> + ?Sized,
{
    async fn handle(&self, intent: Intent<T>) -> HandlerResult {
        (**self).handle(intent).await
    }
}

/// Result of a successful [`IntentRouter::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The registered handler ran and succeeded.
    Handled,
    /// No handler is registered for the intent's type; nothing ran.
    Unrouted,
}

type ErasedHandler = Arc<dyn Fn(Box<dyn Any + Send>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

#[derive(Clone)]
struct Route {
    intent: &'static str,
    handler: ErasedHandler,
}

/// Routes each intent to the one handler registered for its payload type.
#[derive(Default)]
pub struct IntentRouter {
    routes: RwLock<HashMap<TypeId, Route>>,
}

impl IntentRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to intents carrying `T`, replacing any earlier binding.
    pub fn register<T, H>(&self, handler: H)
    where
        T: IntentPayload,
        H: IntentHandler<T> + 'static,
    {
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Arc::new(move |boxed: Box<dyn Any + Send>| {
            let handler = Arc::clone(&handler);
            async move {
                let intent = boxed.downcast::<Intent<T>>().map_err(|_| {
                    HandlerError::msg(format!("route for {} received a foreign intent", T::NAME))
                })?;
                handler.handle(*intent).await
            }
            .boxed()
        });

        let route = Route {
            intent: T::NAME,
            handler: erased,
        };
        let replaced = self
            .routes
            .write_recover()
            .insert(TypeId::of::<T>(), route)
            .is_some();

        if replaced {
            debug!(intent = T::NAME, "Replaced existing intent handler");
        }
        info!(intent = T::NAME, "Registered intent handler");
    }

    /// Binds an async closure to intents carrying `T`.
    pub fn register_fn<T, F, Fut>(&self, handler: F)
    where
        T: IntentPayload,
        F: Fn(Intent<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register::<T, _>(FnHandler(handler));
    }

    /// Runs the handler registered for `T`.
    ///
    /// Returns `Ok(Unrouted)` when no handler exists. Handler errors and
    /// panics come back as [`DispatchError::Handler`].
    #[instrument(skip_all, fields(intent = T::NAME))]
    pub async fn execute<T: IntentPayload>(&self, intent: Intent<T>) -> DispatchResult<DispatchOutcome> {
        let route = self.routes.read_recover().get(&TypeId::of::<T>()).cloned();
        let Some(route) = route else {
            warn!(intent = T::NAME, "No intent handler registered; intent dropped");
            return Ok(DispatchOutcome::Unrouted);
        };

        debug!(intent = route.intent, trace_id = ?intent.trace_id(), "Executing intent");
        let result = AssertUnwindSafe((route.handler)(Box::new(intent)))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload.as_ref())));

        match result {
            Ok(()) => Ok(DispatchOutcome::Handled),
            Err(source) => {
                error!(intent = route.intent, error = %source, "Intent handler failed");
                Err(DispatchError::Handler {
                    intent: route.intent,
                    source,
                })
            }
        }
    }

    /// Whether a handler is registered for `T`.
    pub fn is_routed<T: IntentPayload>(&self) -> bool {
        self.routes.read_recover().contains_key(&TypeId::of::<T>())
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.routes.read_recover().len()
    }
}

impl std::fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&'static str> =
            self.routes.read_recover().values().map(|r| r.intent).collect();
        names.sort_unstable();
        f.debug_struct("IntentRouter").field("routes", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    #[derive(Debug, Clone)]
    struct CreateTask {
        name: String,
    }

    impl IntentPayload for CreateTask {
        const NAME: &'static str = "CreateTask";
    }

    #[derive(Debug)]
    struct DeleteTask;

    impl IntentPayload for DeleteTask {
        const NAME: &'static str = "DeleteTask";
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
        names: Arc<std::sync::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl IntentHandler<CreateTask> for Counting {
        async fn handle(&self, intent: Intent<CreateTask>) -> HandlerResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.names.lock().unwrap().push(intent.payload().name.clone());
            Ok(())
        }
    }

    struct Exploding;

    #[async_trait]
    impl IntentHandler<DeleteTask> for Exploding {
        async fn handle(&self, _intent: Intent<DeleteTask>) -> HandlerResult {
            panic!("handler blew up")
        }
    }

    #[tokio::test]
    async fn registered_handler_runs_exactly_once() {
        let router = IntentRouter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let names = Arc::default();
        router.register(Counting {
            calls: Arc::clone(&calls),
            names: Arc::clone(&names),
        });

        let outcome = router
            .execute(Intent::new(CreateTask {
                name: "demo".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*names.lock().unwrap(), vec!["demo".to_string()]);
    }

    #[tokio::test]
    #[traced_test]
    async fn unrouted_intent_is_a_logged_no_op() {
        let router = IntentRouter::new();

        let outcome = router.execute(Intent::new(DeleteTask)).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Unrouted);
        assert!(logs_contain("No intent handler registered"));
        assert!(logs_contain("DeleteTask"));
    }

    #[tokio::test]
    async fn handler_failure_is_wrapped_with_the_intent_name() {
        let router = IntentRouter::new();
        router.register_fn(|_: Intent<CreateTask>| async { Err(HandlerError::msg("name taken")) });

        let err = router
            .execute(Intent::new(CreateTask {
                name: "demo".to_string(),
            }))
            .await
            .unwrap_err();

        let DispatchError::Handler { intent, source } = err;
        assert_eq!(intent, "CreateTask");
        assert_eq!(source.to_string(), "name taken");
    }

    #[tokio::test]
    async fn panicking_handler_becomes_a_dispatch_error() {
        let router = IntentRouter::new();
        router.register(Exploding);

        let err = router.execute(Intent::new(DeleteTask)).await.unwrap_err();

        assert!(err.to_string().contains("handler blew up"));
        assert!(router.is_routed::<DeleteTask>());
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let router = IntentRouter::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        router.register_fn(move |_: Intent<DeleteTask>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let counter = Arc::clone(&second);
        router.register_fn(move |_: Intent<DeleteTask>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        router.execute(Intent::new(DeleteTask)).await.unwrap();

        assert_eq!(router.route_count(), 1);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trace_id_reaches_the_handler() {
        let router = IntentRouter::new();
        let seen = Arc::new(std::sync::Mutex::new(None));
        let slot = Arc::clone(&seen);
        router.register_fn(move |intent: Intent<DeleteTask>| {
            let slot = Arc::clone(&slot);
            async move {
                *slot.lock().unwrap() = intent.trace_id().map(ToString::to_string);
                Ok(())
            }
        });

        let trace = TraceId::try_new("req-7").unwrap();
        router
            .execute(Intent::new(DeleteTask).with_trace_id(trace))
            .await
            .unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("req-7"));
    }
}
