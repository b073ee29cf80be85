//! Event records and the factory producers use to create them.
//!
//! An event exists in two states. A [`NewEvent`] has everything except an
//! identifier; only an event store turns it into an [`Event`] by assigning the
//! next id. Nothing else in the crate can mint an id for a new event.

use crate::types::{CauseId, EventId, EventSource, EventType, SemanticTier, Timestamp, TraceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Event payload: an unordered mapping from field name to arbitrary JSON value.
pub type Payload = HashMap<String, serde_json::Value>;

/// An event that has been created but not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    occurred_at: Timestamp,
    event_type: EventType,
    source: EventSource,
    semantic_tier: SemanticTier,
    trace_id: Option<TraceId>,
    cause_id: Option<CauseId>,
    payload: Payload,
}

impl NewEvent {
    /// Creates an event stamped with the current time and an empty payload.
    pub fn new(event_type: EventType, source: EventSource, semantic_tier: SemanticTier) -> Self {
        Self {
            occurred_at: Timestamp::now(),
            event_type,
            source,
            semantic_tier,
            trace_id: None,
            cause_id: None,
            payload: Payload::new(),
        }
    }

    /// Replaces the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Adds one payload field.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Sets the trace id.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Sets the cause id.
    #[must_use]
    pub fn with_cause_id(mut self, cause_id: CauseId) -> Self {
        self.cause_id = Some(cause_id);
        self
    }

    /// Overrides the occurrence time. Used when importing historical events.
    #[must_use]
    pub const fn occurred_at(mut self, occurred_at: Timestamp) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// The event type.
    pub const fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Turns this event into its persisted form.
    ///
    /// Only event store adapters call this, with the id they just allocated.
    pub fn persisted(self, id: EventId) -> Event {
        Event {
            id,
            occurred_at: self.occurred_at,
            event_type: self.event_type,
            source: self.source,
            semantic_tier: self.semantic_tier,
            trace_id: self.trace_id,
            cause_id: self.cause_id,
            payload: self.payload,
        }
    }
}

/// A persisted, immutable event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    occurred_at: Timestamp,
    event_type: EventType,
    source: EventSource,
    semantic_tier: SemanticTier,
    trace_id: Option<TraceId>,
    cause_id: Option<CauseId>,
    payload: Payload,
}

impl Event {
    /// Store-assigned identifier.
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// When the event occurred.
    pub const fn occurred_at(&self) -> Timestamp {
        self.occurred_at
    }

    /// The event type.
    pub const fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// The producing component.
    pub const fn source(&self) -> &EventSource {
        &self.source
    }

    /// Significance tier.
    pub const fn semantic_tier(&self) -> SemanticTier {
        self.semantic_tier
    }

    /// Trace id of the request that started the causal chain.
    pub const fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Id of the event that caused this one.
    pub const fn cause_id(&self) -> Option<&CauseId> {
        self.cause_id.as_ref()
    }

    /// The payload.
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Looks up one payload field.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }
}

/// Creates events for one producer, carrying its causal chain along.
///
/// ```ignore
/// let factory = EventFactory::new(source).with_trace_id(TraceId::generate());
/// let event = factory.create_with_payload(created_task, SemanticTier::Internal, payload);
/// bus.publish(event).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFactory {
    source: EventSource,
    trace_id: Option<TraceId>,
    cause_id: Option<CauseId>,
}

impl EventFactory {
    /// A factory with no causal chain.
    pub const fn new(source: EventSource) -> Self {
        Self {
            source,
            trace_id: None,
            cause_id: None,
        }
    }

    /// A factory for the same source that stamps `trace_id` and no cause.
    #[must_use]
    pub fn with_trace_id(&self, trace_id: TraceId) -> Self {
        Self {
            source: self.source.clone(),
            trace_id: Some(trace_id),
            cause_id: None,
        }
    }

    /// A factory for the same source that stamps both trace and cause.
    #[must_use]
    pub fn with_trace_and_cause(&self, trace_id: TraceId, cause_id: CauseId) -> Self {
        Self {
            source: self.source.clone(),
            trace_id: Some(trace_id),
            cause_id: Some(cause_id),
        }
    }

    /// A factory continuing the chain of `event`: same trace, caused by `event`.
    #[must_use]
    pub fn caused_by(&self, event: &Event) -> Self {
        Self {
            source: self.source.clone(),
            trace_id: event.trace_id().cloned(),
            cause_id: Some(CauseId::from(event.id())),
        }
    }

    /// The source stamped on every event.
    pub const fn source(&self) -> &EventSource {
        &self.source
    }

    /// Creates an event with an empty payload.
    pub fn create(&self, event_type: EventType, semantic_tier: SemanticTier) -> NewEvent {
        NewEvent {
            occurred_at: Timestamp::now(),
            event_type,
            source: self.source.clone(),
            semantic_tier,
            trace_id: self.trace_id.clone(),
            cause_id: self.cause_id.clone(),
            payload: Payload::new(),
        }
    }

    /// Creates an event with an explicit cause, overriding the factory's.
    pub fn create_caused_by(
        &self,
        event_type: EventType,
        semantic_tier: SemanticTier,
        cause_id: CauseId,
    ) -> NewEvent {
        self.create(event_type, semantic_tier).with_cause_id(cause_id)
    }

    /// Creates an event carrying `payload`.
    pub fn create_with_payload(
        &self,
        event_type: EventType,
        semantic_tier: SemanticTier,
        payload: Payload,
    ) -> NewEvent {
        self.create(event_type, semantic_tier).with_payload(payload)
    }
}
