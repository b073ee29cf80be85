//! Replay delivers every persisted event exactly once, in ascending id
//! order, whatever the page size.

use orbit::bus::{EventBus, StandardEventBus};
use orbit::config::{BusConfig, PageSize};
use orbit::event::NewEvent;
use orbit::replay::ReplayRange;
use orbit::types::{EventSource, EventType, ReplayLevel, SemanticTier};
use orbit_memory::InMemoryEventStore;
use orbit_testing::RecordingListener;
use proptest::prelude::*;
use std::sync::Arc;

fn event() -> NewEvent {
    NewEvent::new(
        EventType::try_new("tick").unwrap(),
        EventSource::try_new("property").unwrap(),
        SemanticTier::Ambient,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replay_all_is_complete_and_ascending(event_count in 0usize..60, page_size in 1usize..25) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let config = BusConfig::default().with_page_size(PageSize::try_new(page_size).unwrap());
            let bus = StandardEventBus::with_config(Arc::new(InMemoryEventStore::new()), config);
            for _ in 0..event_count {
                bus.publish(event()).await.unwrap();
            }

            let recorder = RecordingListener::new();
            let summary = bus
                .replay(ReplayRange::from_beginning(ReplayLevel::Full), &recorder)
                .await
                .unwrap();

            let expected: Vec<u64> = (1..=event_count as u64).collect();
            prop_assert_eq!(recorder.ids(), expected);
            prop_assert_eq!(summary.delivered, event_count);
            // an empty history still costs one fetch
            prop_assert_eq!(summary.pages, event_count.div_ceil(page_size).max(1));
            Ok(())
        })?;
    }
}
