//! In-process, non-durable [`EventStore`].
//!
//! Used by tests and by the `memory` backend for local experiments. Records
//! live in a `Vec` in insertion order, so "newest first" is a reverse scan.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::store::next_recorded_at;
use crate::{
    Clock, EventId, EventRecord, EventStore, NormalizedEvent, RecentLimit, StoreError, SystemClock,
};

/// A [`Vec`]-backed event store.
pub struct MemoryEventStore {
    records: Mutex<Vec<EventRecord>>,
    clock: Arc<dyn Clock>,
}

impl MemoryEventStore {
    /// Creates an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store that reads ingestion time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            clock,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<EventRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::unavailable("memory store lock poisoned"))
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: NormalizedEvent) -> Result<EventId, StoreError> {
        let mut records = self.lock()?;
        let recorded_at = next_recorded_at(
            self.clock.now(),
            records.last().map(EventRecord::recorded_at),
        )?;
        let id = EventId::new_random();
        records.push(EventRecord::new(id, event, recorded_at));
        Ok(id)
    }

    async fn list_recent(&self, limit: RecentLimit) -> Result<Vec<EventRecord>, StoreError> {
        let records = self.lock()?;
        Ok(records.iter().rev().take(limit.as_usize()).cloned().collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.len() as u64)
    }
}
