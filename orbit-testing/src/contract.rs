//! Behavioral contract for [`EventStore`] adapters.
//!
//! Every scenario gets a fresh store from `make_store`. Adapters plug in with
//! the [`event_store_contract_tests!`](crate::event_store_contract_tests)
//! macro:
//!
//! ```ignore
//! orbit_testing::event_store_contract_tests! {
//!     suite = in_memory,
//!     make_store = orbit_memory::InMemoryEventStore::new,
//! }
//! ```

use std::fmt;

use chrono::{TimeZone, Utc};
use orbit::config::PageSize;
use orbit::errors::EventStoreError;
use orbit::event::{Event, NewEvent};
use orbit::store::{EventStore, Page, PageRequest};
use orbit::types::{EventId, EventSource, EventType, SemanticTier, Timestamp};

/// A contract scenario that did not hold.
#[derive(Debug)]
pub struct ContractTestFailure {
    scenario: &'static str,
    detail: String,
}

impl ContractTestFailure {
    fn new(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self {
            scenario,
            detail: detail.into(),
        }
    }

    fn store_error(
        scenario: &'static str,
        operation: &'static str,
        error: &EventStoreError,
    ) -> Self {
        Self::new(
            scenario,
            format!("{operation} operation returned unexpected error: {error}"),
        )
    }

    fn assertion(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self::new(scenario, detail)
    }
}

impl fmt::Display for ContractTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scenario, self.detail)
    }
}

impl std::error::Error for ContractTestFailure {}

/// Result of one contract scenario.
pub type ContractTestResult = Result<(), ContractTestFailure>;

fn contract_event(scenario: &'static str, secs: i64) -> Result<NewEvent, ContractTestFailure> {
    let event_type = EventType::try_new(format!("contract_{scenario}"))
        .map_err(|e| ContractTestFailure::assertion(scenario, format!("bad event type: {e}")))?;
    let source = EventSource::try_new("contract")
        .map_err(|e| ContractTestFailure::assertion(scenario, format!("bad source: {e}")))?;
    let at = Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ContractTestFailure::assertion(scenario, "bad timestamp"))?;

    Ok(NewEvent::new(event_type, source, SemanticTier::Internal).occurred_at(Timestamp::new(at)))
}

fn page_size(scenario: &'static str, size: usize) -> Result<PageSize, ContractTestFailure> {
    PageSize::try_new(size)
        .map_err(|e| ContractTestFailure::assertion(scenario, format!("bad page size: {e}")))
}

fn event_id(scenario: &'static str, raw: u64) -> Result<EventId, ContractTestFailure> {
    EventId::try_new(raw)
        .map_err(|e| ContractTestFailure::assertion(scenario, format!("bad event id: {e}")))
}

async fn save_at<S: EventStore>(
    scenario: &'static str,
    store: &S,
    seconds: &[i64],
) -> Result<Vec<Event>, ContractTestFailure> {
    let mut saved = Vec::with_capacity(seconds.len());
    for &secs in seconds {
        let event = store
            .save(contract_event(scenario, secs)?)
            .await
            .map_err(|error| ContractTestFailure::store_error(scenario, "save", &error))?;
        saved.push(event);
    }
    Ok(saved)
}

fn raw_ids(events: &[Event]) -> Vec<u64> {
    events.iter().map(|e| e.id().into()).collect()
}

fn expect_ids(
    scenario: &'static str,
    label: &str,
    page: &Page<Event>,
    expected: &[u64],
) -> ContractTestResult {
    let observed = raw_ids(&page.items);
    if observed != expected {
        return Err(ContractTestFailure::assertion(
            scenario,
            format!("{label}: expected ids {expected:?}, observed {observed:?}"),
        ));
    }
    Ok(())
}

/// `save` assigns ids starting at 1 that strictly increase.
pub async fn test_ids_strictly_increase<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + 'static,
{
    const SCENARIO: &str = "ids_strictly_increase";

    let store = make_store();
    let saved = save_at(SCENARIO, &store, &[10, 10, 5]).await?;
    let ids = raw_ids(&saved);

    if ids.first() != Some(&1) {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected first id to be 1, observed {ids:?}"),
        ));
    }
    if !ids.windows(2).all(|w| w[0] < w[1]) {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected strictly increasing ids, observed {ids:?}"),
        ));
    }
    Ok(())
}

/// `find_all` pages through everything in ascending id order.
pub async fn test_find_all_pages_ascending<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + 'static,
{
    const SCENARIO: &str = "find_all_pages_ascending";

    let store = make_store();
    save_at(SCENARIO, &store, &[1, 2, 3, 4, 5]).await?;

    let mut request = PageRequest::first(page_size(SCENARIO, 2)?);
    let mut seen = Vec::new();
    let mut pages = 0_usize;
    loop {
        let page = store
            .find_all(request)
            .await
            .map_err(|error| ContractTestFailure::store_error(SCENARIO, "find_all", &error))?;
        pages += 1;
        if page.items.len() > 2 {
            return Err(ContractTestFailure::assertion(
                SCENARIO,
                format!("page {pages} exceeded the requested size"),
            ));
        }
        seen.extend(raw_ids(&page.items));
        if !page.has_more {
            break;
        }
        if pages > 10 {
            return Err(ContractTestFailure::assertion(SCENARIO, "has_more never cleared"));
        }
        request = request.next();
    }

    if seen != [1, 2, 3, 4, 5] || pages != 3 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected ids 1..=5 over 3 pages, observed {seen:?} over {pages}"),
        ));
    }
    Ok(())
}

/// An empty store answers with one empty, final page.
pub async fn test_empty_store_has_no_events<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + 'static,
{
    const SCENARIO: &str = "empty_store_has_no_events";

    let store = make_store();
    let page = store
        .find_all(PageRequest::first(PageSize::default()))
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "find_all", &error))?;

    if !page.items.is_empty() || page.has_more {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!(
                "expected an empty final page, observed {} items, has_more={}",
                page.items.len(),
                page.has_more
            ),
        ));
    }
    Ok(())
}

/// Id and time bounds are inclusive; both together intersect.
pub async fn test_bounds_are_inclusive<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + 'static,
{
    const SCENARIO: &str = "bounds_are_inclusive";

    let store = make_store();
    // ids 1..=5 at descending times so the two bounds select different sets
    let saved = save_at(SCENARIO, &store, &[50, 40, 30, 20, 10]).await?;
    let request = PageRequest::first(page_size(SCENARIO, 100)?);
    let id = event_id(SCENARIO, 2)?;
    let time = saved[3].occurred_at();

    let by_id = store
        .find_from_id(id, request)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "find_from_id", &error))?;
    expect_ids(SCENARIO, "id bound", &by_id, &[2, 3, 4, 5])?;

    let by_time = store
        .find_from_time(time, request)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "find_from_time", &error))?;
    expect_ids(SCENARIO, "time bound", &by_time, &[1, 2, 3, 4])?;

    let both = store
        .find_from_id_and_time(id, time, request)
        .await
        .map_err(|error| {
            ContractTestFailure::store_error(SCENARIO, "find_from_id_and_time", &error)
        })?;
    expect_ids(SCENARIO, "both bounds", &both, &[2, 3, 4])
}

/// Stored events come back with the fields they were saved with.
pub async fn test_round_trip_preserves_fields<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + 'static,
{
    const SCENARIO: &str = "round_trip_preserves_fields";

    let store = make_store();
    let event = contract_event(SCENARIO, 42)?.with_entry("taskName", "demo");
    let saved = store
        .save(event)
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "save", &error))?;

    let page = store
        .find_from_id(saved.id(), PageRequest::first(PageSize::default()))
        .await
        .map_err(|error| ContractTestFailure::store_error(SCENARIO, "find_from_id", &error))?;

    match page.items.first() {
        Some(loaded) if *loaded == saved => Ok(()),
        Some(loaded) => Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("loaded event differs from saved: {loaded:?} vs {saved:?}"),
        )),
        None => Err(ContractTestFailure::assertion(
            SCENARIO,
            "saved event was not found by its id",
        )),
    }
}

/// Expands to a module of `#[tokio::test]`s running the whole contract.
#[macro_export]
macro_rules! event_store_contract_tests {
    (suite = $suite:ident, make_store = $make_store:expr $(,)?) => {
        #[allow(non_snake_case)]
        mod $suite {
            use $crate::contract::{
                test_bounds_are_inclusive, test_empty_store_has_no_events,
                test_find_all_pages_ascending, test_ids_strictly_increase,
                test_round_trip_preserves_fields,
            };

            #[tokio::test(flavor = "multi_thread")]
            async fn ids_strictly_increase_contract() {
                test_ids_strictly_increase($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn find_all_pages_ascending_contract() {
                test_find_all_pages_ascending($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn empty_store_has_no_events_contract() {
                test_empty_store_has_no_events($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn bounds_are_inclusive_contract() {
                test_bounds_are_inclusive($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn round_trip_preserves_fields_contract() {
                test_round_trip_preserves_fields($make_store)
                    .await
                    .expect("event store contract failed");
            }
        }
    };
}

pub use event_store_contract_tests;
