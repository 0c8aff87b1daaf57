//! hookfeed HTTP surface.
//!
//! Receives GitHub webhook deliveries, hands them to [`feed::IngestionService`],
//! and serves the recent-events polling API backed by [`feed::QueryService`].
//!
//! ## Endpoints
//!
//! | Method | Path | Handler | Notes |
//! |--------|------|---------|-------|
//! | `POST` | `/webhook` | [`handlers::webhook::receive_webhook`] | `X-GitHub-Event` selects the payload shape |
//! | `GET` | `/api/events?limit=N` | [`handlers::events::list_recent`] | newest first, `N >= 1` |
//! | `GET` | `/health` | [`handlers::health::liveness_handler`] | process is up |
//! | `GET` | `/health/ready` | [`handlers::health::readiness_handler`] | store answers |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP status codes, header names and the JSON error
//! envelope live here. The [`feed`] crate never sees a request.

pub mod display;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, DEFAULT_RECENT_LIMIT};

use std::{future::Future, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

/// Serves the API on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish once `shutdown` fires.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "listening for webhooks");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("listener stopped");
    Ok(())
}
