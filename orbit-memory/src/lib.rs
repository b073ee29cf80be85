//! In-memory adapter for `Orbit`
//!
//! This crate provides an in-memory implementation of the `EventStore` trait
//! from the orbit crate, useful for testing, development and single-session
//! tools where persistence across restarts is not required.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use orbit::errors::{EventStoreError, EventStoreResult};
use orbit::event::{Event, NewEvent};
use orbit::replay::ReplayQuery;
use orbit::store::{EventStore, Page, PageRequest};
use orbit::types::{EventId, Timestamp};
use tracing::trace;

/// Thread-safe in-memory event store
///
/// Events are kept in insertion order, which is also ascending id order.
/// Clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    // Append-only; ids are assigned from the position of the last element
    events: Arc<RwLock<Vec<Event>>>,
}

impl InMemoryEventStore {
    /// Create a new empty in-memory event store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted events
    pub fn len(&self) -> usize {
        self.events.read().map_or(0, |events| events.len())
    }

    /// Whether nothing has been persisted yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn query(&self, query: ReplayQuery, page: PageRequest) -> EventStoreResult<Page<Event>> {
        let events = self.events.read().map_err(poisoned)?;

        // Ids ascend with position, so an id bound can skip straight to its slot.
        let start = match query {
            ReplayQuery::FromId(id) | ReplayQuery::FromIdAndTime(id, _) => {
                events.partition_point(|e| e.id() < id)
            }
            ReplayQuery::All | ReplayQuery::FromTime(_) => 0,
        };

        let size = page.size.get();
        let mut items: Vec<Event> = events[start..]
            .iter()
            .filter(|e| query.matches(e))
            .skip(page.offset())
            .take(size.saturating_add(1))
            .cloned()
            .collect();
        let has_more = items.len() > size;
        items.truncate(size);

        trace!(?query, page = page.number, items = items.len(), has_more, "Queried events");
        Ok(Page::new(items, has_more))
    }
}

impl std::fmt::Debug for InMemoryEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventStore")
            .field("events", &self.len())
            .finish()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> EventStoreError {
    EventStoreError::Internal("event storage lock poisoned".to_string())
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn save(&self, event: NewEvent) -> EventStoreResult<Event> {
        let mut events = self.events.write().map_err(poisoned)?;

        let id = match events.last() {
            Some(last) => last.id().next().ok_or_else(|| {
                EventStoreError::Internal("event id space exhausted".to_string())
            })?,
            None => EventId::first(),
        };
        let event = event.persisted(id);
        events.push(event.clone());

        trace!(event_id = %id, event_type = %event.event_type(), "Saved event");
        Ok(event)
    }

    async fn find_all(&self, page: PageRequest) -> EventStoreResult<Page<Event>> {
        self.query(ReplayQuery::All, page)
    }

    async fn find_from_id(
        &self,
        from: EventId,
        page: PageRequest,
    ) -> EventStoreResult<Page<Event>> {
        self.query(ReplayQuery::FromId(from), page)
    }

    async fn find_from_time(
        &self,
        from: Timestamp,
        page: PageRequest,
    ) -> EventStoreResult<Page<Event>> {
        self.query(ReplayQuery::FromTime(from), page)
    }

    async fn find_from_id_and_time(
        &self,
        from_id: EventId,
        from_time: Timestamp,
        page: PageRequest,
    ) -> EventStoreResult<Page<Event>> {
        self.query(ReplayQuery::FromIdAndTime(from_id, from_time), page)
    }
}
