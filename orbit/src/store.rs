//! Event store port.
//!
//! The bus depends on this trait for persistence and replay queries; it never
//! assumes anything about the backend beyond the contract below:
//!
//! - `save` assigns a unique id strictly greater than every earlier id
//! - every query returns events ascending by id, in pages of the requested size
//! - lower bounds are inclusive

use crate::config::PageSize;
use crate::errors::EventStoreResult;
use crate::event::{Event, NewEvent};
use crate::types::{EventId, Timestamp};
use async_trait::async_trait;

/// Which page of a query to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page number
    pub number: usize,
    /// Events per page
    pub size: PageSize,
}

impl PageRequest {
    /// The first page of the given size.
    pub const fn first(size: PageSize) -> Self {
        Self { number: 0, size }
    }

    /// The page after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            number: self.number + 1,
            size: self.size,
        }
    }

    /// Number of events preceding this page.
    pub fn offset(&self) -> usize {
        self.number.saturating_mul(self.size.get())
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items in ascending id order
    pub items: Vec<T>,
    /// Whether a later page exists
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Creates a page.
    pub const fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    /// A page with no items and nothing after it.
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
        }
    }

    /// Slices a page out of a fully materialized, already ordered result set.
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let offset = request.offset();
        let end = offset.saturating_add(request.size.get());
        let items = all
            .into_iter()
            .skip(offset)
            .take(request.size.get())
            .collect();
        Self {
            items,
            has_more: total > end,
        }
    }
}

/// Persistence backend for events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists an event, assigning its id.
    async fn save(&self, event: NewEvent) -> EventStoreResult<Event>;

    /// All events from the beginning.
    async fn find_all(&self, page: PageRequest) -> EventStoreResult<Page<Event>>;

    /// Events whose id is at least `from`.
    async fn find_from_id(&self, from: EventId, page: PageRequest)
        -> EventStoreResult<Page<Event>>;

    /// Events that occurred at or after `from`.
    async fn find_from_time(
        &self,
        from: Timestamp,
        page: PageRequest,
    ) -> EventStoreResult<Page<Event>>;

    /// Events satisfying both lower bounds.
    async fn find_from_id_and_time(
        &self,
        from_id: EventId,
        from_time: Timestamp,
        page: PageRequest,
    ) -> EventStoreResult<Page<Event>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> PageSize {
        PageSize::try_new(n).unwrap()
    }

    #[test]
    fn slice_reports_has_more_until_the_last_page() {
        let all: Vec<u32> = (1..=7).collect();

        let first = Page::slice(all.clone(), PageRequest::first(size(3)));
        assert_eq!(first.items, vec![1, 2, 3]);
        assert!(first.has_more);

        let third = Page::slice(all.clone(), PageRequest::first(size(3)).next().next());
        assert_eq!(third.items, vec![7]);
        assert!(!third.has_more);

        let beyond = Page::slice(all, PageRequest { number: 5, size: size(3) });
        assert!(beyond.items.is_empty());
        assert!(!beyond.has_more);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let all: Vec<u32> = (1..=6).collect();
        let second = Page::slice(all, PageRequest::first(size(3)).next());
        assert_eq!(second.items, vec![4, 5, 6]);
        assert!(!second.has_more);
    }
}
