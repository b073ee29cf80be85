//! Core value types shared by the bus, the router and the registry.
//!
//! All string identifiers use smart constructors so an invalid value can never
//! be observed past the boundary where it was parsed.

use chrono::{DateTime, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to an event by the event store when it is persisted.
///
/// Identifiers start at 1 and increase strictly with every save. Callers never
/// construct one for a new event; they only use it to describe replay bounds.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct EventId(u64);

impl EventId {
    /// The first identifier a store hands out.
    pub fn first() -> Self {
        Self::try_new(1).expect("1 is always a valid event id")
    }

    /// Returns the identifier following this one, or `None` once the id
    /// space is exhausted.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let current: u64 = self.into();
        current
            .checked_add(1)
            .and_then(|next| Self::try_new(next).ok())
    }
}

/// The type name of an event, e.g. `created_task`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct EventType(String);

/// The component that produced an event.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct EventSource(String);

/// Identifies the request that started a causal chain.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct TraceId(String);

impl TraceId {
    /// Generates a fresh, time-ordered trace id.
    pub fn generate() -> Self {
        Self::try_new(Uuid::now_v7().to_string()).expect("uuid strings are never empty")
    }
}

/// Identifies the event that directly caused another event.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct CauseId(String);

impl From<EventId> for CauseId {
    fn from(event_id: EventId) -> Self {
        Self::try_new(event_id.to_string()).expect("rendered event ids are never empty")
    }
}

/// A timestamp for when an event occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a new timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Coarse significance of an event, used by listeners to filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticTier {
    /// Bookkeeping inside the application itself.
    Internal,
    /// Something happened at the edge of the user's attention.
    Peripheral,
    /// Background signal with no direct user action behind it.
    Ambient,
}

impl SemanticTier {
    /// Lowercase wire name of the tier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Peripheral => "peripheral",
            Self::Ambient => "ambient",
        }
    }
}

impl std::fmt::Display for SemanticTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How deeply a replay is meant to re-run listener behaviour.
///
/// The bus only carries the level through to listeners; what each level
/// means for side effects is decided by the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayLevel {
    /// Re-run everything, including follow-up intents and commands.
    Full,
    /// Rebuild in-memory state only.
    StateOnly,
    /// Observe the history without changing anything.
    Inspect,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn event_id_rejects_zero_and_accepts_positive(v in 1u64..u64::MAX) {
            prop_assert!(EventId::try_new(0).is_err());
            let id = EventId::try_new(v).unwrap();
            let raw: u64 = id.into();
            prop_assert_eq!(raw, v);
        }

        #[test]
        fn event_id_next_is_strictly_greater(v in 1u64..u64::MAX) {
            let id = EventId::try_new(v).unwrap();
            prop_assert!(id.next().unwrap() > id);
        }

        #[test]
        fn event_type_trims_whitespace(s in " {0,5}[a-z_]{1,40} {0,5}") {
            let event_type = EventType::try_new(s.clone()).unwrap();
            prop_assert_eq!(event_type.as_str(), s.trim());
        }

        #[test]
        fn event_type_rejects_blank(s in " {0,20}") {
            prop_assert!(EventType::try_new(s).is_err());
        }
    }

    #[test]
    fn last_event_id_has_no_successor() {
        assert_eq!(EventId::try_new(u64::MAX).unwrap().next(), None);
    }

    #[test]
    fn cause_id_from_event_id_uses_decimal_rendering() {
        let cause = CauseId::from(EventId::try_new(42).unwrap());
        assert_eq!(cause.as_str(), "42");
    }

    #[test]
    fn generated_trace_ids_are_unique() {
        assert_ne!(TraceId::generate(), TraceId::generate());
    }

    #[test]
    fn semantic_tier_serializes_lowercase() {
        let json = serde_json::to_string(&SemanticTier::Peripheral).unwrap();
        assert_eq!(json, "\"peripheral\"");
        assert_eq!(SemanticTier::Ambient.to_string(), "ambient");
    }

    #[test]
    fn replay_level_round_trips_through_json() {
        let json = serde_json::to_string(&ReplayLevel::StateOnly).unwrap();
        assert_eq!(json, "\"state_only\"");
        let level: ReplayLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(level, ReplayLevel::StateOnly);
    }
}
