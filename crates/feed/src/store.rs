//! The event store port.
//!
//! The services in this crate talk to persistence only through [`EventStore`].
//! Implementations: [`crate::memory::MemoryEventStore`] here, and the durable
//! SQLite store in the `store` crate.

use async_trait::async_trait;

use crate::{EventId, EventRecord, NormalizedEvent, RecentLimit, StoreError, Timestamp};

/// Append-only storage of event records, read back newest first.
///
/// ## Contract
///
/// - `append` sets `recorded_at` exactly once, from the store's [`Clock`],
///   strictly after the `recorded_at` of every record already in the store.
///   When it returns `Ok` the record is durable for the backing technology.
/// - `list_recent` returns at most `limit` records ordered by `recorded_at`
///   descending; equal timestamps sort later insertions first. Each call is an
///   independent snapshot.
/// - Records are never updated or deleted.
/// - Implementations are safe to call concurrently from many tasks.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists `event` and returns the identifier assigned to it.
    async fn append(&self, event: NormalizedEvent) -> Result<EventId, StoreError>;

    /// Returns up to `limit` of the most recently recorded events.
    async fn list_recent(&self, limit: RecentLimit) -> Result<Vec<EventRecord>, StoreError>;

    /// Returns the number of stored records.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Source of ingestion time for stores.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Picks the `recorded_at` for a new record: the clock reading, or one tick
/// after the latest existing record if the clock has not moved past it.
///
/// Fails with [`StoreError::Corrupt`] when `latest` is the last representable
/// instant, since nothing can be recorded after it.
pub fn next_recorded_at(now: Timestamp, latest: Option<Timestamp>) -> Result<Timestamp, StoreError> {
    match latest {
        Some(latest) if now <= latest => latest.next_tick().ok_or_else(|| {
            StoreError::corrupt(format!("latest recorded_at '{latest}' has no successor"))
        }),
        _ => Ok(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_at_never_goes_backwards() {
        let t0 = Timestamp::parse_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let t1 = Timestamp::parse_rfc3339("2024-01-01T00:00:01Z").unwrap();

        assert_eq!(next_recorded_at(t0, None).unwrap(), t0);
        assert_eq!(next_recorded_at(t1, Some(t0)).unwrap(), t1);
        assert_eq!(next_recorded_at(t0, Some(t0)).unwrap(), t0.next_tick().unwrap());
        assert_eq!(next_recorded_at(t0, Some(t1)).unwrap(), t1.next_tick().unwrap());
    }

    #[test]
    fn no_successor_after_the_last_instant() {
        let now = Timestamp::parse_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let last = Timestamp::from_utc(chrono::DateTime::<chrono::Utc>::MAX_UTC);

        let err = next_recorded_at(now, Some(last)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
