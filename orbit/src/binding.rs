//! Declarative listener bindings.
//!
//! A component describes the events it reacts to as a list of
//! [`ListenerBinding`]s and hands them to the bus at startup. Each binding
//! names an event type, optionally narrows by source and semantic tier, and
//! carries exactly one callback. The callback's shape is chosen by the builder
//! method used to attach it, so an unusable binding is rejected when it is
//! registered rather than when the first event arrives.
//!
//! ```ignore
//! let binding = ListenerBinding::for_type("created_task")
//!     .from_source("TaskService")
//!     .on_context_event(move |ctx, event| tasks.apply(ctx, event));
//! bus.bind(binding)?;
//! ```

use crate::bus::{EventBus, EventFilter, EventListener};
use crate::context::EventContext;
use crate::errors::{BindingError, HandlerResult};
use crate::event::Event;
use crate::types::{EventSource, EventType, SemanticTier};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

type BareFn = dyn Fn() -> HandlerResult + Send + Sync;
type EventFn = dyn Fn(&Event) -> HandlerResult + Send + Sync;
type ContextFn = dyn Fn(&EventContext) -> HandlerResult + Send + Sync;
type ContextEventFn = dyn Fn(&EventContext, &Event) -> HandlerResult + Send + Sync;
type EventContextFn = dyn Fn(&Event, &EventContext) -> HandlerResult + Send + Sync;

/// The accepted callback shapes.
#[derive(Clone)]
enum BindingCallback {
    Bare(Arc<BareFn>),
    Event(Arc<EventFn>),
    Context(Arc<ContextFn>),
    ContextEvent(Arc<ContextEventFn>),
    EventContext(Arc<EventContextFn>),
    Listener(Arc<dyn EventListener>),
}

impl BindingCallback {
    const fn shape(&self) -> &'static str {
        match self {
            Self::Bare(_) => "()",
            Self::Event(_) => "(event)",
            Self::Context(_) => "(context)",
            Self::ContextEvent(_) => "(context, event)",
            Self::EventContext(_) => "(event, context)",
            Self::Listener(_) => "listener",
        }
    }
}

#[async_trait]
impl EventListener for BindingCallback {
    async fn on_event(&self, context: &EventContext, event: &Event) -> HandlerResult {
        match self {
            Self::Bare(f) => f(),
            Self::Event(f) => f(event),
            Self::Context(f) => f(context),
            Self::ContextEvent(f) => f(context, event),
            Self::EventContext(f) => f(event, context),
            Self::Listener(listener) => listener.on_event(context, event).await,
        }
    }
}

/// Filter derived from a binding's declaration.
///
/// Matches events of exactly one type. A source, when present, must equal the
/// event's source; a non-empty tier set must contain the event's tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingFilter {
    event_type: EventType,
    source: Option<EventSource>,
    tiers: HashSet<SemanticTier>,
}

impl BindingFilter {
    /// Creates a filter for `event_type` with no further narrowing.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            source: None,
            tiers: HashSet::new(),
        }
    }

    /// Restricts the filter to one source.
    #[must_use]
    pub fn with_source(mut self, source: EventSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Restricts the filter to the given tiers.
    #[must_use]
    pub fn with_tiers(mut self, tiers: impl IntoIterator<Item = SemanticTier>) -> Self {
        self.tiers.extend(tiers);
        self
    }

    /// The event type this filter accepts.
    pub const fn event_type(&self) -> &EventType {
        &self.event_type
    }
}

impl EventFilter for BindingFilter {
    fn matches(&self, event: &Event) -> bool {
        if event.event_type() != &self.event_type {
            return false;
        }
        if let Some(source) = &self.source {
            if event.source() != source {
                return false;
            }
        }
        self.tiers.is_empty() || self.tiers.contains(&event.semantic_tier())
    }
}

/// Declaration of one listener: what it listens to and what it calls.
///
/// Built with [`ListenerBinding::for_type`], validated by
/// [`ListenerBinding::register`].
#[derive(Clone)]
pub struct ListenerBinding {
    event_type: String,
    source: Option<String>,
    tiers: HashSet<SemanticTier>,
    callback: Option<BindingCallback>,
}

impl ListenerBinding {
    /// Starts a binding for events of type `event_type`.
    pub fn for_type(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source: None,
            tiers: HashSet::new(),
            callback: None,
        }
    }

    /// Only accept events from `source`. An empty source means any source.
    #[must_use]
    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Only accept events in one of `tiers`. No tiers means any tier.
    #[must_use]
    pub fn in_tiers(mut self, tiers: impl IntoIterator<Item = SemanticTier>) -> Self {
        self.tiers.extend(tiers);
        self
    }

    /// Callback taking no arguments.
    #[must_use]
    pub fn on_bare<F>(self, callback: F) -> Self
    where
        F: Fn() -> HandlerResult + Send + Sync + 'static,
    {
        self.with_callback(BindingCallback::Bare(Arc::new(callback)))
    }

    /// Callback taking the event.
    #[must_use]
    pub fn on_event<F>(self, callback: F) -> Self
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        self.with_callback(BindingCallback::Event(Arc::new(callback)))
    }

    /// Callback taking the delivery context.
    #[must_use]
    pub fn on_context<F>(self, callback: F) -> Self
    where
        F: Fn(&EventContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.with_callback(BindingCallback::Context(Arc::new(callback)))
    }

    /// Callback taking the context, then the event.
    #[must_use]
    pub fn on_context_event<F>(self, callback: F) -> Self
    where
        F: Fn(&EventContext, &Event) -> HandlerResult + Send + Sync + 'static,
    {
        self.with_callback(BindingCallback::ContextEvent(Arc::new(callback)))
    }

    /// Callback taking the event, then the context.
    #[must_use]
    pub fn on_event_context<F>(self, callback: F) -> Self
    where
        F: Fn(&Event, &EventContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.with_callback(BindingCallback::EventContext(Arc::new(callback)))
    }

    /// Delegates to an existing (possibly async) listener.
    #[must_use]
    pub fn with_listener(self, listener: Arc<dyn EventListener>) -> Self {
        self.with_callback(BindingCallback::Listener(listener))
    }

    fn with_callback(mut self, callback: BindingCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Validates the declaration and produces its filter and listener.
    pub fn build(self) -> Result<(BindingFilter, Arc<dyn EventListener>), BindingError> {
        let event_type = EventType::try_new(self.event_type.clone())
            .map_err(|_| BindingError::InvalidEventType(self.event_type.clone()))?;

        let mut filter = BindingFilter::new(event_type).with_tiers(self.tiers);
        if let Some(raw) = self.source.filter(|s| !s.trim().is_empty()) {
            let source =
                EventSource::try_new(raw.clone()).map_err(|_| BindingError::InvalidSource(raw))?;
            filter = filter.with_source(source);
        }

        let callback = self.callback.ok_or_else(|| BindingError::MissingCallback {
            event_type: self.event_type,
        })?;

        debug!(
            event_type = %filter.event_type(),
            shape = callback.shape(),
            "Built listener binding"
        );
        Ok((filter, Arc::new(callback)))
    }

    /// Validates the declaration and subscribes it on `bus`.
    pub fn register<B: EventBus + ?Sized>(self, bus: &B) -> Result<(), BindingError> {
        let (filter, listener) = self.build()?;
        bus.subscribe(Arc::new(filter), listener)?;
        Ok(())
    }
}

impl std::fmt::Debug for ListenerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerBinding")
            .field("event_type", &self.event_type)
            .field("source", &self.source)
            .field("tiers", &self.tiers)
            .field("callback", &self.callback.as_ref().map(BindingCallback::shape))
            .finish()
    }
}

/// A component that declares the listeners it wants on the bus.
pub trait ListenerSet {
    /// The component's bindings, in registration order.
    fn listener_bindings(&self) -> Vec<ListenerBinding>;
}

/// Validates every binding first, then subscribes them all.
///
/// Nothing is subscribed if any binding is invalid.
pub fn bind_all<B: EventBus + ?Sized>(
    bus: &B,
    bindings: impl IntoIterator<Item = ListenerBinding>,
) -> Result<usize, BindingError> {
    let built = bindings
        .into_iter()
        .map(ListenerBinding::build)
        .collect::<Result<Vec<_>, _>>()?;

    let count = built.len();
    for (filter, listener) in built {
        bus.subscribe(Arc::new(filter), listener)?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NewEvent;
    use crate::types::{EventId, ReplayLevel};
    use std::sync::Mutex;

    fn event(event_type: &str, source: &str, tier: SemanticTier) -> Event {
        NewEvent::new(
            EventType::try_new(event_type).unwrap(),
            EventSource::try_new(source).unwrap(),
            tier,
        )
        .persisted(EventId::first())
    }

    fn noop() -> HandlerResult {
        Ok(())
    }

    #[test]
    fn filter_requires_exact_type() {
        let (filter, _) = ListenerBinding::for_type("created_task")
            .on_bare(noop)
            .build()
            .unwrap();

        assert!(filter.matches(&event("created_task", "A", SemanticTier::Internal)));
        assert!(!filter.matches(&event("created_task_v2", "A", SemanticTier::Internal)));
    }

    #[test]
    fn filter_narrows_by_source_and_tier() {
        let (filter, _) = ListenerBinding::for_type("created_task")
            .from_source("TaskService")
            .in_tiers([SemanticTier::Internal, SemanticTier::Peripheral])
            .on_bare(noop)
            .build()
            .unwrap();

        assert!(filter.matches(&event("created_task", "TaskService", SemanticTier::Peripheral)));
        assert!(!filter.matches(&event("created_task", "Other", SemanticTier::Internal)));
        assert!(!filter.matches(&event("created_task", "TaskService", SemanticTier::Ambient)));
    }

    #[test]
    fn empty_source_means_any_source() {
        let (filter, _) = ListenerBinding::for_type("created_task")
            .from_source("  ")
            .on_bare(noop)
            .build()
            .unwrap();

        assert!(filter.matches(&event("created_task", "Anyone", SemanticTier::Ambient)));
    }

    #[test]
    fn missing_callback_is_rejected() {
        let Err(err) = ListenerBinding::for_type("created_task").build() else {
            panic!("a binding without a callback must be rejected");
        };
        assert!(matches!(
            err,
            BindingError::MissingCallback { ref event_type } if event_type == "created_task"
        ));
    }

    #[test]
    fn blank_event_type_is_rejected() {
        let Err(err) = ListenerBinding::for_type("   ").on_bare(noop).build() else {
            panic!("a blank event type must be rejected");
        };
        assert!(matches!(err, BindingError::InvalidEventType(_)));
    }

    #[tokio::test]
    async fn every_shape_receives_its_arguments() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let ctx = EventContext::replayed(ReplayLevel::Inspect, false);
        let ev = event("created_task", "A", SemanticTier::Internal);

        let s = Arc::clone(&seen);
        let bare = ListenerBinding::for_type("created_task").on_bare(move || {
            s.lock().unwrap().push("bare".to_string());
            Ok(())
        });
        let s = Arc::clone(&seen);
        let with_event = ListenerBinding::for_type("created_task").on_event(move |e| {
            s.lock().unwrap().push(format!("event:{}", e.event_type()));
            Ok(())
        });
        let s = Arc::clone(&seen);
        let with_context = ListenerBinding::for_type("created_task").on_context(move |c| {
            s.lock().unwrap().push(format!("context:{}", c.is_replay()));
            Ok(())
        });
        let s = Arc::clone(&seen);
        let context_event =
            ListenerBinding::for_type("created_task").on_context_event(move |c, e| {
                s.lock()
                    .unwrap()
                    .push(format!("ce:{}:{}", c.is_replay(), e.id()));
                Ok(())
            });
        let s = Arc::clone(&seen);
        let event_context =
            ListenerBinding::for_type("created_task").on_event_context(move |e, c| {
                s.lock()
                    .unwrap()
                    .push(format!("ec:{}:{:?}", e.id(), c.replay_level()));
                Ok(())
            });

        for binding in [bare, with_event, with_context, context_event, event_context] {
            let (_, listener) = binding.build().unwrap();
            listener.on_event(&ctx, &ev).await.unwrap();
        }

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "bare".to_string(),
                "event:created_task".to_string(),
                "context:true".to_string(),
                "ce:true:1".to_string(),
                "ec:1:Some(Inspect)".to_string(),
            ]
        );
    }

    #[test]
    fn later_callback_replaces_earlier_one() {
        let binding = ListenerBinding::for_type("created_task")
            .on_bare(noop)
            .on_event(|_| Ok(()));
        assert!(format!("{binding:?}").contains("(event)"));
    }
}
