//! Replay bounds are inclusive and combine as an intersection.

use chrono::{TimeZone, Utc};
use orbit::bus::{EventBus, StandardEventBus};
use orbit::config::{BusConfig, PageSize};
use orbit::event::{Event, NewEvent};
use orbit::replay::ReplayRange;
use orbit::types::{EventId, EventSource, EventType, ReplayLevel, SemanticTier, Timestamp};
use orbit_memory::InMemoryEventStore;
use orbit_testing::RecordingListener;
use proptest::prelude::*;
use std::sync::Arc;

fn at(secs: i64) -> Timestamp {
    Timestamp::new(Utc.timestamp_opt(secs, 0).unwrap())
}

fn event_at(secs: i64) -> NewEvent {
    NewEvent::new(
        EventType::try_new("tick").unwrap(),
        EventSource::try_new("property").unwrap(),
        SemanticTier::Peripheral,
    )
    .occurred_at(at(secs))
}

/// Publishes one event per entry of `times`, in order, and replays `range`
/// through pages of `page_size`. Returns the published events and the
/// replayed ids.
fn publish_and_replay(
    times: &[i64],
    page_size: usize,
    range: impl FnOnce(&[Event]) -> ReplayRange,
) -> (Vec<Event>, Vec<u64>) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let config = BusConfig::default().with_page_size(PageSize::try_new(page_size).unwrap());
        let bus = StandardEventBus::with_config(Arc::new(InMemoryEventStore::new()), config);
        let mut published = Vec::new();
        for &secs in times {
            published.push(bus.publish(event_at(secs)).await.unwrap());
        }

        let recorder = RecordingListener::new();
        bus.replay(range(&published), &recorder).await.unwrap();
        (published, recorder.ids())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn id_bound_keeps_ids_at_or_above_it(
        times in prop::collection::vec(0i64..1_000, 1..40),
        bound in 1u64..45,
        page_size in 1usize..10,
    ) {
        let (published, replayed) = publish_and_replay(&times, page_size, |_| {
            ReplayRange::from_beginning(ReplayLevel::Full)
                .from_event_id(EventId::try_new(bound).unwrap())
        });

        let expected: Vec<u64> = published
            .iter()
            .map(|e| u64::from(e.id()))
            .filter(|id| *id >= bound)
            .collect();
        prop_assert_eq!(replayed, expected);
    }

    #[test]
    fn time_bound_keeps_events_at_or_after_it(
        times in prop::collection::vec(0i64..1_000, 1..40),
        bound in 0i64..1_000,
        page_size in 1usize..10,
    ) {
        let (published, replayed) = publish_and_replay(&times, page_size, |_| {
            ReplayRange::from_beginning(ReplayLevel::Full).from_time(at(bound))
        });

        let expected: Vec<u64> = published
            .iter()
            .filter(|e| e.occurred_at() >= at(bound))
            .map(|e| u64::from(e.id()))
            .collect();
        prop_assert_eq!(replayed, expected);
    }

    #[test]
    fn both_bounds_intersect(
        times in prop::collection::vec(0i64..1_000, 1..40),
        id_bound in 1u64..45,
        time_bound in 0i64..1_000,
        page_size in 1usize..10,
    ) {
        let (published, replayed) = publish_and_replay(&times, page_size, |_| {
            ReplayRange::from_beginning(ReplayLevel::Inspect)
                .from_event_id(EventId::try_new(id_bound).unwrap())
                .from_time(at(time_bound))
        });

        let expected: Vec<u64> = published
            .iter()
            .filter(|e| u64::from(e.id()) >= id_bound && e.occurred_at() >= at(time_bound))
            .map(|e| u64::from(e.id()))
            .collect();
        prop_assert_eq!(replayed, expected);
    }
}

#[test]
fn bound_matching_an_existing_event_includes_it() {
    let (published, replayed) = publish_and_replay(&[10, 20, 30], 2, |events| {
        ReplayRange::from_beginning(ReplayLevel::Full)
            .from_event_id(events[1].id())
            .from_time(events[1].occurred_at())
    });

    assert_eq!(published.len(), 3);
    assert_eq!(replayed, vec![2, 3]);
}
