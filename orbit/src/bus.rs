//! Publish/subscribe event bus with replay of persisted history.
//!
//! Delivery is synchronous from the caller's point of view: `publish` returns
//! only after every matching listener has run, one after another in
//! registration order. Listener failures (returned errors and panics) are
//! logged and isolated so one faulty listener cannot starve the rest.
//! Persistence failures are not isolated; they propagate to the caller.
//!
//! The subscription list is copy-on-write. A publish iterates the snapshot
//! taken when it started, so a listener registered concurrently (or by another
//! listener during delivery) sees every later publish but not the in-flight one.

use crate::binding::{bind_all, ListenerBinding, ListenerSet};
use crate::config::{BusConfig, HistoryRetention};
use crate::context::EventContext;
use crate::errors::{BindingError, BusError, BusResult, HandlerError, HandlerResult};
use crate::event::{Event, NewEvent};
use crate::replay::{ReplayCancellation, ReplayRange, ReplaySummary};
use crate::store::{EventStore, PageRequest};
use crate::sync::RwLockRecovery;
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, instrument};

/// Predicate selecting which events a subscription receives.
pub trait EventFilter: Send + Sync {
    /// Returns whether `event` should be delivered.
    fn matches(&self, event: &Event) -> bool;
}

impl<F> EventFilter for F
where
    F: Fn(&Event) -> bool + Send + Sync,
{
    fn matches(&self, event: &Event) -> bool {
        self(event)
    }
}

/// Receives events from the bus.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Handles one delivery. An error is logged by the bus and does not stop
    /// delivery to other listeners.
    async fn on_event(&self, context: &EventContext, event: &Event) -> HandlerResult;
}

#[async_trait]
impl<F> EventListener for F
where
    F: Fn(&EventContext, &Event) -> HandlerResult + Send + Sync,
{
    async fn on_event(&self, context: &EventContext, event: &Event) -> HandlerResult {
        self(context, event)
    }
}

/// The event bus contract.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Persists `event` and delivers it to every matching subscription.
    ///
    /// Returns the persisted event with its store-assigned id.
    async fn publish(&self, event: NewEvent) -> BusResult<Event>;

    /// Registers a listener for events accepted by `filter`.
    ///
    /// Subscriptions stay active until the bus is closed.
    fn subscribe(
        &self,
        filter: Arc<dyn EventFilter>,
        listener: Arc<dyn EventListener>,
    ) -> BusResult<()>;

    /// Replays persisted events in `range` to `listener` only.
    ///
    /// Live subscriptions are never notified.
    async fn replay(
        &self,
        range: ReplayRange,
        listener: &dyn EventListener,
    ) -> BusResult<ReplaySummary> {
        self.replay_with_cancellation(range, listener, &ReplayCancellation::new())
            .await
    }

    /// Like [`replay`](Self::replay), stopping early once `cancellation` fires.
    async fn replay_with_cancellation(
        &self,
        range: ReplayRange,
        listener: &dyn EventListener,
        cancellation: &ReplayCancellation,
    ) -> BusResult<ReplaySummary>;

    /// Closes the bus, dropping subscriptions and history. Idempotent.
    fn close(&self);

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}

/// Convenience methods available on every bus, including `dyn EventBus`.
pub trait EventBusExt: EventBus {
    /// Subscribes a concrete filter and listener.
    fn on<F, L>(&self, filter: F, listener: L) -> BusResult<()>
    where
        F: EventFilter + 'static,
        L: EventListener + 'static,
    {
        self.subscribe(Arc::new(filter), Arc::new(listener))
    }

    /// Validates and subscribes one declarative binding.
    fn bind(&self, binding: ListenerBinding) -> Result<(), BindingError> {
        binding.register(self)
    }

    /// Subscribes every binding a component declares. Nothing is subscribed
    /// if any binding is invalid.
    fn bind_set(&self, set: &dyn ListenerSet) -> Result<usize, BindingError> {
        bind_all(self, set.listener_bindings())
    }
}

impl<B: EventBus + ?Sized> EventBusExt for B {}

#[derive(Clone)]
struct Subscription {
    filter: Arc<dyn EventFilter>,
    listener: Arc<dyn EventListener>,
}

/// The standard [`EventBus`] backed by an [`EventStore`].
pub struct StandardEventBus {
    store: Arc<dyn EventStore>,
    config: BusConfig,
    subscriptions: RwLock<Arc<Vec<Subscription>>>,
    history: RwLock<VecDeque<Event>>,
    closed: AtomicBool,
}

impl StandardEventBus {
    /// Creates a bus with the default configuration.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self::with_config(store, BusConfig::default())
    }

    /// Creates a bus with a custom configuration.
    pub fn with_config(store: Arc<dyn EventStore>, config: BusConfig) -> Self {
        Self {
            store,
            config,
            subscriptions: RwLock::new(Arc::new(Vec::new())),
            history: RwLock::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// The active configuration.
    pub const fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Events published through this bus since it was created, oldest first.
    pub fn history(&self) -> Vec<Event> {
        self.history.read_recover().iter().cloned().collect()
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read_recover().len()
    }

    fn ensure_open(&self) -> BusResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        Ok(())
    }

    /// Records `event` and snapshots the subscriptions to notify.
    ///
    /// `closed` is re-checked under the history lock, which `close` also
    /// holds, so nothing is recorded or delivered once `close` has run.
    fn record(&self, event: &Event) -> BusResult<Arc<Vec<Subscription>>> {
        let mut history = self.history.write_recover();
        self.ensure_open()?;
        if let HistoryRetention::Bounded(capacity) = self.config.history {
            let capacity: usize = capacity.into();
            while history.len() >= capacity {
                history.pop_front();
            }
        }
        history.push_back(event.clone());
        Ok(Arc::clone(&*self.subscriptions.read_recover()))
    }
}

impl std::fmt::Debug for StandardEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardEventBus")
            .field("config", &self.config)
            .field("subscriptions", &self.subscription_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn filter_matches(filter: &dyn EventFilter, event: &Event) -> bool {
    std::panic::catch_unwind(AssertUnwindSafe(|| filter.matches(event))).unwrap_or_else(|payload| {
        let err = HandlerError::from_panic(payload.as_ref());
        error!(
            event_id = %event.id(),
            event_type = %event.event_type(),
            error = %err,
            "Event filter panicked; treating as no match"
        );
        false
    })
}

/// Invokes one listener, isolating its failure. Returns whether it succeeded.
async fn deliver(listener: &dyn EventListener, context: &EventContext, event: &Event) -> bool {
    let result = AssertUnwindSafe(listener.on_event(context, event))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload.as_ref())));

    match result {
        Ok(()) => true,
        Err(err) => {
            error!(
                event_id = %event.id(),
                event_type = %event.event_type(),
                replay = context.is_replay(),
                error = %err,
                "Event listener failed"
            );
            false
        }
    }
}

#[async_trait]
impl EventBus for StandardEventBus {
    #[instrument(skip_all, fields(event_type = %event.event_type()))]
    async fn publish(&self, event: NewEvent) -> BusResult<Event> {
        self.ensure_open()?;

        let event = self.store.save(event).await?;
        let subscriptions = self.record(&event).inspect_err(|_| {
            debug!(event_id = %event.id(), "Bus closed while the event was being saved");
        })?;
        let mut notified = 0_usize;
        for subscription in subscriptions.iter() {
            if filter_matches(subscription.filter.as_ref(), &event) {
                let context = EventContext::live();
                let _ = deliver(subscription.listener.as_ref(), &context, &event).await;
                notified += 1;
            }
        }

        debug!(event_id = %event.id(), notified, "Published event");
        Ok(event)
    }

    fn subscribe(
        &self,
        filter: Arc<dyn EventFilter>,
        listener: Arc<dyn EventListener>,
    ) -> BusResult<()> {
        self.ensure_open()?;

        let mut subscriptions = self.subscriptions.write_recover();
        let mut next = Vec::with_capacity(subscriptions.len() + 1);
        next.extend(subscriptions.iter().cloned());
        next.push(Subscription { filter, listener });
        *subscriptions = Arc::new(next);

        info!(subscriptions = subscriptions.len(), "Subscribed event listener");
        Ok(())
    }

    #[instrument(skip_all, fields(level = ?range.level(), query = ?range.query()))]
    async fn replay_with_cancellation(
        &self,
        range: ReplayRange,
        listener: &dyn EventListener,
        cancellation: &ReplayCancellation,
    ) -> BusResult<ReplaySummary> {
        self.ensure_open()?;

        let query = range.query();
        let context = EventContext::replayed(range.level(), range.is_dry_run());
        let mut summary = ReplaySummary::default();
        let mut page = PageRequest::first(self.config.page_size);

        info!("Starting replay");
        'pages: loop {
            if cancellation.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let batch = query.fetch(self.store.as_ref(), page).await?;
            summary.pages += 1;

            for event in &batch.items {
                if cancellation.is_cancelled() {
                    summary.cancelled = true;
                    break 'pages;
                }
                if !deliver(listener, &context, event).await {
                    summary.failed += 1;
                }
                summary.delivered += 1;
            }

            if !batch.has_more {
                break;
            }
            debug!(page = page.number, "Fetched replay page");
            page = page.next();
            // Let other sessions run between pages of a long replay.
            tokio::task::yield_now().await;
        }

        info!(
            delivered = summary.delivered,
            failed = summary.failed,
            pages = summary.pages,
            cancelled = summary.cancelled,
            "Replay finished"
        );
        Ok(summary)
    }

    fn close(&self) {
        let mut history = self.history.write_recover();
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Event bus already closed");
            return;
        }
        history.clear();
        *self.subscriptions.write_recover() = Arc::new(Vec::new());
        drop(history);
        info!("Event bus closed");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
