//! Health check handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::ApiResult, state::AppState};

/// Liveness probe handler.
pub async fn liveness_handler() -> &'static str {
    "OK"
}

/// Readiness probe handler: the store must answer a count query.
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let events = state.store.count().await?;
    Ok(Json(json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION"),
        "events": events,
    })))
}
