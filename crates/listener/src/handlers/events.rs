//! `GET /api/events`

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use feed::RecentLimit;
use serde::Deserialize;

use crate::{display::EventView, error::ApiResult, state::AppState};

/// Query string of a poll.
#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    /// Maximum number of events; validated by [`RecentLimit::parse`].
    pub limit: Option<String>,
}

/// Returns the most recent events, newest first.
pub async fn list_recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> ApiResult<Json<Vec<EventView>>> {
    let limit = match params.limit.as_deref() {
        Some(raw) => RecentLimit::parse(raw)?,
        None => state.default_limit,
    };
    let records = state.query.recent_validated(limit).await?;
    Ok(Json(records.into_iter().map(EventView::from).collect()))
}
