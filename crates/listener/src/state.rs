//! Shared handler state.

use std::sync::Arc;

use feed::{EventStore, IngestionService, QueryService, RecentLimit};

/// Number of events returned when a poll omits `limit`.
pub const DEFAULT_RECENT_LIMIT: RecentLimit = match RecentLimit::new(100) {
    Some(limit) => limit,
    None => panic!("default limit must be positive"),
};

/// Services shared by every request. Both services wrap the same store.
#[derive(Clone)]
pub struct AppState {
    /// Write side.
    pub ingest: IngestionService,
    /// Read side.
    pub query: QueryService,
    /// The store itself, for readiness checks.
    pub store: Arc<dyn EventStore>,
    /// Limit applied when a poll omits one.
    pub default_limit: RecentLimit,
}

impl AppState {
    /// Wires both services to `store`.
    pub fn new(store: Arc<dyn EventStore>, default_limit: RecentLimit) -> Self {
        Self {
            ingest: IngestionService::new(Arc::clone(&store)),
            query: QueryService::new(Arc::clone(&store)),
            store,
            default_limit,
        }
    }

    /// Same as [`AppState::new`] with [`DEFAULT_RECENT_LIMIT`].
    pub fn with_default_limit(store: Arc<dyn EventStore>) -> Self {
        Self::new(store, DEFAULT_RECENT_LIMIT)
    }
}
