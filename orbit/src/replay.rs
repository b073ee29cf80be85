//! Replay ranges and the store queries they resolve to.

use crate::errors::EventStoreResult;
use crate::event::Event;
use crate::store::{EventStore, Page, PageRequest};
use crate::types::{EventId, ReplayLevel, Timestamp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Inclusive lower bounds on the history to replay.
///
/// Both bounds present means their intersection; neither means everything
/// from the beginning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayRange {
    from_event_id: Option<EventId>,
    from_time: Option<Timestamp>,
    level: ReplayLevel,
    dry_run: bool,
}

impl ReplayRange {
    /// The whole history at `level`.
    pub const fn from_beginning(level: ReplayLevel) -> Self {
        Self {
            from_event_id: None,
            from_time: None,
            level,
            dry_run: false,
        }
    }

    /// Restricts the range to ids at or above `id`.
    #[must_use]
    pub const fn from_event_id(mut self, id: EventId) -> Self {
        self.from_event_id = Some(id);
        self
    }

    /// Restricts the range to events that occurred at or after `time`.
    #[must_use]
    pub const fn from_time(mut self, time: Timestamp) -> Self {
        self.from_time = Some(time);
        self
    }

    /// Marks every replayed delivery as a dry run.
    #[must_use]
    pub const fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// The id bound, if any.
    pub const fn event_id_bound(&self) -> Option<EventId> {
        self.from_event_id
    }

    /// The time bound, if any.
    pub const fn time_bound(&self) -> Option<Timestamp> {
        self.from_time
    }

    /// The level handed to listeners.
    pub const fn level(&self) -> ReplayLevel {
        self.level
    }

    /// Whether deliveries are dry runs.
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Resolves the bounds into the store query that serves them.
    pub const fn query(&self) -> ReplayQuery {
        match (self.from_event_id, self.from_time) {
            (Some(id), Some(time)) => ReplayQuery::FromIdAndTime(id, time),
            (Some(id), None) => ReplayQuery::FromId(id),
            (None, Some(time)) => ReplayQuery::FromTime(time),
            (None, None) => ReplayQuery::All,
        }
    }
}

/// A resolved replay query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayQuery {
    /// No bound: the whole history.
    All,
    /// Id lower bound only.
    FromId(EventId),
    /// Time lower bound only.
    FromTime(Timestamp),
    /// Both bounds, intersected.
    FromIdAndTime(EventId, Timestamp),
}

impl ReplayQuery {
    /// Fetches one page of this query from `store`.
    pub async fn fetch(
        &self,
        store: &dyn EventStore,
        page: PageRequest,
    ) -> EventStoreResult<Page<Event>> {
        match *self {
            Self::All => store.find_all(page).await,
            Self::FromId(id) => store.find_from_id(id, page).await,
            Self::FromTime(time) => store.find_from_time(time, page).await,
            Self::FromIdAndTime(id, time) => store.find_from_id_and_time(id, time, page).await,
        }
    }

    /// Whether `event` falls inside the bounds.
    pub fn matches(&self, event: &Event) -> bool {
        match *self {
            Self::All => true,
            Self::FromId(id) => event.id() >= id,
            Self::FromTime(time) => event.occurred_at() >= time,
            Self::FromIdAndTime(id, time) => event.id() >= id && event.occurred_at() >= time,
        }
    }
}

/// Cooperative cancellation signal for a running replay.
///
/// Clones share the same flag; the replay checks it before every delivery.
#[derive(Debug, Clone, Default)]
pub struct ReplayCancellation {
    cancelled: Arc<AtomicBool>,
}

impl ReplayCancellation {
    /// A signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the replay stop before its next delivery.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// What a replay call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Events handed to the listener
    pub delivered: usize,
    /// Listener invocations that reported failure
    pub failed: usize,
    /// Store pages fetched
    pub pages: usize,
    /// Whether the replay stopped early on cancellation
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> Timestamp {
        Timestamp::new(Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn bounds_resolve_to_the_matching_query() {
        let id = EventId::try_new(5).unwrap();
        let base = ReplayRange::from_beginning(ReplayLevel::Full);

        assert_eq!(base.query(), ReplayQuery::All);
        assert_eq!(base.from_event_id(id).query(), ReplayQuery::FromId(id));
        assert_eq!(base.from_time(at(10)).query(), ReplayQuery::FromTime(at(10)));
        assert_eq!(
            base.from_event_id(id).from_time(at(10)).query(),
            ReplayQuery::FromIdAndTime(id, at(10))
        );
    }

    #[test]
    fn dry_run_is_opt_in() {
        let range = ReplayRange::from_beginning(ReplayLevel::Inspect);
        assert!(!range.is_dry_run());
        assert!(range.dry_run().is_dry_run());
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let signal = ReplayCancellation::new();
        let handle = signal.clone();
        assert!(!signal.is_cancelled());
        handle.cancel();
        assert!(signal.is_cancelled());
    }
}
