//! Listener that records every delivery for later assertions.
//!
//! ```ignore
//! let recorder = RecordingListener::new();
//! bus.on(|_: &Event| true, recorder.clone())?;
//! bus.publish(event).await?;
//! assert_eq!(recorder.len(), 1);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use orbit::bus::EventListener;
use orbit::context::EventContext;
use orbit::errors::HandlerResult;
use orbit::event::Event;

/// One recorded delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Context the bus passed
    pub context: EventContext,
    /// The delivered event
    pub event: Event,
}

/// Collects deliveries in shared storage.
///
/// Clones share the same storage, so a clone can be handed to the bus while
/// the test keeps the original for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl RecordingListener {
    /// Creates a listener with empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// All deliveries so far, in delivery order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().clone()
    }

    /// Delivered events, in delivery order.
    pub fn events(&self) -> Vec<Event> {
        self.lock().iter().map(|d| d.event.clone()).collect()
    }

    /// Raw ids of the delivered events, in delivery order.
    pub fn ids(&self) -> Vec<u64> {
        self.lock().iter().map(|d| d.event.id().into()).collect()
    }

    /// Number of deliveries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forgets every delivery recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Delivery>> {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventListener for RecordingListener {
    async fn on_event(&self, context: &EventContext, event: &Event) -> HandlerResult {
        self.lock().push(Delivery {
            context: *context,
            event: event.clone(),
        });
        Ok(())
    }
}
