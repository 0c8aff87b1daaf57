//! Read side for polling consumers.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{EventRecord, EventStore, QueryError, RecentLimit};

impl RecentLimit {
    /// Validates a caller-supplied limit.
    pub fn try_from_i64(limit: i64) -> Result<Self, QueryError> {
        u32::try_from(limit)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| QueryError::InvalidArgument {
                message: format!("limit must be a positive integer no larger than {}, got {limit}", u32::MAX),
            })
    }

    /// Validates a raw query-string value (e.g. the `limit` in `?limit=20`).
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let limit = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| QueryError::InvalidArgument {
                message: format!("limit must be a positive integer, got '{raw}'"),
            })?;
        Self::try_from_i64(limit)
    }
}

impl TryFrom<u32> for RecentLimit {
    type Error = QueryError;

    fn try_from(limit: u32) -> Result<Self, Self::Error> {
        Self::try_from_i64(i64::from(limit))
    }
}

/// Returns the most recent events, newest first.
///
/// A thin pass-through to [`EventStore::list_recent`] with no caching, so
/// every completed append is visible to the next call.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn EventStore>,
}

impl QueryService {
    /// Creates a service reading from `store`.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Returns up to `limit` records. `limit` must be in `1..=u32::MAX`.
    #[instrument(name = "recent", skip(self))]
    pub async fn recent(&self, limit: i64) -> Result<Vec<EventRecord>, QueryError> {
        let limit = RecentLimit::try_from_i64(limit)?;
        self.recent_validated(limit).await
    }

    /// Same as [`QueryService::recent`] for an already validated limit.
    pub async fn recent_validated(&self, limit: RecentLimit) -> Result<Vec<EventRecord>, QueryError> {
        let records = self.store.list_recent(limit).await?;
        debug!(%limit, returned = records.len(), "listed recent events");
        Ok(records)
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Author, BranchName, MemoryEventStore, NormalizedEvent, RepositoryName, Timestamp};

    async fn seeded(n: usize) -> QueryService {
        let store = Arc::new(MemoryEventStore::new());
        for i in 0..n {
            store
                .append(NormalizedEvent::push(
                    Author::new(format!("user{i}")).unwrap(),
                    BranchName::new("main").unwrap(),
                    RepositoryName::new("r1").unwrap(),
                    Timestamp::now(),
                ))
                .await
                .unwrap();
        }
        QueryService::new(store)
    }

    #[tokio::test]
    async fn non_positive_limits_are_invalid() {
        let service = seeded(1).await;
        for limit in [0, -1, i64::MIN, i64::from(u32::MAX) + 1] {
            assert!(matches!(
                service.recent(limit).await,
                Err(QueryError::InvalidArgument { .. })
            ));
        }
    }

    #[tokio::test]
    async fn never_returns_more_than_limit() {
        let service = seeded(7).await;
        assert_eq!(service.recent(5).await.unwrap().len(), 5);
        assert_eq!(service.recent(50).await.unwrap().len(), 7);
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let service = seeded(6).await;
        let first = service.recent(5).await.unwrap();
        let second = service.recent(5).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn raw_limits_are_validated() {
        assert_eq!(RecentLimit::parse(" 20 ").unwrap().get(), 20);
        assert!(RecentLimit::parse("0").is_err());
        assert!(RecentLimit::parse("-3").is_err());
        assert!(RecentLimit::parse("ten").is_err());
        assert!(RecentLimit::parse("").is_err());
    }
}
