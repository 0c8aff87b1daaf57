//! HTTP routes.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{events, health, webhook},
    state::AppState,
};

/// Creates the router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/webhook",
            post(webhook::receive_webhook)
                .layer(DefaultBodyLimit::max(webhook::MAX_PAYLOAD_BYTES)),
        )
        .route("/api/events", get(events::list_recent))
        .route("/health", get(health::liveness_handler))
        .route("/health/ready", get(health::readiness_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
