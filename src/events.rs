//! Append-only event log

use crate::store::StoreError;
use smartlock_protocol::{FetchRequest, LockEvent};
use std::sync::RwLock;

pub trait EventStore {
    /// Append an event.
    fn save(&self, event: LockEvent) -> Result<(), StoreError>;

    /// Newest first, `offset`/`limit` applied before the predicate.
    fn fetch(&self, request: &FetchRequest) -> Result<Vec<LockEvent>, StoreError>;

    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// Apply a fetch request to events in insertion order
///
/// Pagination slices the unfiltered, date-sorted log, so a page may hold
/// fewer than `limit` events even when more matching events exist.
pub fn fetch_events<'a, I>(events: I, request: &FetchRequest) -> Vec<LockEvent>
where
    I: IntoIterator<Item = &'a LockEvent>,
{
    let mut sorted: Vec<&LockEvent> = events.into_iter().collect();
    // stable, so events sharing a date keep insertion order
    sorted.sort_by(|a, b| b.date().cmp(&a.date()));
    let limit = request.limit.map_or(usize::MAX, usize::from);
    sorted
        .into_iter()
        .skip(usize::from(request.offset))
        .take(limit)
        .filter(|event| {
            request
                .predicate
                .as_ref()
                .map_or(true, |predicate| predicate.matches(event))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<LockEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn save(&self, event: LockEvent) -> Result<(), StoreError> {
        self.events
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .push(event);
        Ok(())
    }

    fn fetch(&self, request: &FetchRequest) -> Result<Vec<LockEvent>, StoreError> {
        let events = self.events.read().map_err(|_| StoreError::Poisoned)?;
        Ok(fetch_events(events.iter(), request))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.events.read().map_err(|_| StoreError::Poisoned)?.len())
    }
}
