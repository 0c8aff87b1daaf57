//! Webhook ingestion: normalise, then append.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{normalize, EventStore, IngestOutcome};

/// Turns raw webhook deliveries into stored events.
///
/// One call makes at most one `append` attempt. Failures are reported, never
/// retried, and identical deliveries are stored as separate records.
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn EventStore>,
}

impl IngestionService {
    /// Creates a service writing to `store`.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Normalises `payload` according to `event_type` and appends the result.
    #[instrument(name = "ingest", skip(self, payload), fields(outcome = tracing::field::Empty))]
    pub async fn handle(&self, payload: &Value, event_type: &str) -> IngestOutcome {
        let event = match normalize(payload, event_type) {
            Ok(event) => event,
            Err(reason) => {
                info!(code = reason.code(), %reason, "payload rejected");
                tracing::Span::current().record("outcome", "rejected");
                return IngestOutcome::Rejected(reason);
            }
        };

        let action = event.action();
        let outcome = match self.store.append(event).await {
            Ok(id) => {
                info!(%id, %action, "event stored");
                IngestOutcome::Accepted(id)
            }
            Err(error) => {
                warn!(%error, %action, "event store append failed");
                IngestOutcome::Failed(error)
            }
        };
        tracing::Span::current().record("outcome", outcome.label());
        outcome
    }
}

impl std::fmt::Debug for IngestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        EventId, EventRecord, MemoryEventStore, NormalizedEvent, RecentLimit, RejectionReason,
        StoreError,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts appends and fails every one of them.
    #[derive(Default)]
    struct FailingStore {
        appends: AtomicUsize,
    }

    #[async_trait]
    impl EventStore for FailingStore {
        async fn append(&self, _event: NormalizedEvent) -> Result<EventId, StoreError> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::unavailable("database is locked"))
        }

        async fn list_recent(&self, _limit: RecentLimit) -> Result<Vec<EventRecord>, StoreError> {
            Err(StoreError::unavailable("database is locked"))
        }

        async fn count(&self) -> Result<u64, StoreError> {
            Err(StoreError::unavailable("database is locked"))
        }
    }

    fn push_payload(author: &str) -> Value {
        json!({
            "ref": "refs/heads/main",
            "pusher": { "name": author },
            "repository": { "full_name": "octo/r1" },
            "head_commit": { "timestamp": "2021-04-01T21:30:00Z" }
        })
    }

    #[tokio::test]
    async fn valid_push_is_accepted_and_stored() {
        let store = Arc::new(MemoryEventStore::new());
        let service = IngestionService::new(store.clone());

        let outcome = service.handle(&push_payload("alice"), "push").await;

        let id = outcome.accepted_id().expect("accepted");
        let stored = store.list_recent(RecentLimit::new(1).unwrap()).await.unwrap();
        assert_eq!(stored[0].id(), id);
        assert_eq!(stored[0].author().as_str(), "alice");
    }

    #[tokio::test]
    async fn rejection_never_touches_the_store() {
        let store = Arc::new(FailingStore::default());
        let service = IngestionService::new(store.clone());

        let outcome = service.handle(&json!({ "ref": "refs/heads/main" }), "push").await;

        assert_eq!(
            outcome,
            IngestOutcome::Rejected(RejectionReason::MalformedPayload {
                field: "pusher.name".to_string(),
                detail: "required field is missing or empty".to_string(),
            })
        );
        assert_eq!(store.appends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_is_reported_after_a_single_attempt() {
        let store = Arc::new(FailingStore::default());
        let service = IngestionService::new(store.clone());

        let outcome = service.handle(&push_payload("alice"), "push").await;

        assert!(matches!(outcome, IngestOutcome::Failed(StoreError::Unavailable { .. })));
        assert_eq!(store.appends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn identical_deliveries_are_stored_twice() {
        let store = Arc::new(MemoryEventStore::new());
        let service = IngestionService::new(store.clone());

        let first = service.handle(&push_payload("alice"), "push").await;
        let second = service.handle(&push_payload("alice"), "push").await;

        assert_ne!(first.accepted_id(), second.accepted_id());
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
