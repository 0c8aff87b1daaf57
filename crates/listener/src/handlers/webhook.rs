//! `POST /webhook`

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use feed::{payload::SourceEventType, IngestOutcome, RejectionReason};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::{error::ApiError, state::AppState};

/// Header carrying the event-type hint.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Header carrying GitHub's per-delivery GUID.
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Largest body accepted on `/webhook`. GitHub caps payloads at 25 MB.
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Receives one GitHub webhook delivery.
#[instrument(skip_all, fields(event_type, delivery))]
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let event_type = header(&headers, EVENT_HEADER).unwrap_or_default();
    let delivery = header(&headers, DELIVERY_HEADER).unwrap_or_default();
    let span = tracing::Span::current();
    span.record("event_type", event_type);
    span.record("delivery", delivery);

    if event_type == "ping" {
        info!("answered ping");
        return Ok(Json(json!({ "message": "pong" })).into_response());
    }

    // An unsupported type is reported as such whatever the body holds.
    SourceEventType::parse(event_type).map_err(|reason| {
        info!(code = reason.code(), %reason, "payload rejected");
        ApiError::Rejected(reason)
    })?;

    let payload: Value =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;

    match state.ingest.handle(&payload, event_type).await {
        IngestOutcome::Accepted(id) => Ok((
            StatusCode::CREATED,
            Json(json!({ "status": "stored", "id": id })),
        )
            .into_response()),
        IngestOutcome::Rejected(RejectionReason::IgnoredAction { action }) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "status": "ignored", "action": action })),
        )
            .into_response()),
        IngestOutcome::Rejected(reason) => Err(ApiError::Rejected(reason)),
        IngestOutcome::Failed(err) => Err(ApiError::Store(err)),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
