//! hookfeed entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: `--config` TOML file plus `HOOKFEED__*`
//!    environment overrides, validated before anything starts.
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or pretty layer
//!    and, when configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: the configured [`feed::EventStore`]
//!    (SQLite or in-memory), injected into [`listener::AppState`].
//! 4. **Run a command**: `serve` the HTTP API, or print `recent` events.

mod config;
mod telemetry;

use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feed::{EventStore, MemoryEventStore, QueryService};
use listener::AppState;
use store::SqliteEventStore;
use tokio::signal;
use tracing::info;

use crate::config::{ServiceConfig, StoreBackend};
use crate::telemetry::init_telemetry;

#[derive(Debug, Parser)]
#[command(name = "hookfeed", version, about = "GitHub webhook event feed")]
struct Cli {
    /// Configuration file (TOML). Defaults to `hookfeed.toml` when present.
    #[arg(long, global = true, env = "HOOKFEED_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Receive webhooks and serve the events API until interrupted.
    Serve,
    /// Print the most recent events as JSON lines, newest first.
    Recent {
        /// Number of events; defaults to `query.default_limit`.
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config =
        ServiceConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let telemetry = init_telemetry(&config.telemetry)?;

    let result = match cli.command {
        Command::Serve => serve(&config).await,
        Command::Recent { limit } => recent(&config, limit).await,
    };

    telemetry.shutdown();
    result
}

async fn serve(config: &ServiceConfig) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting hookfeed");

    let store = open_store(config)?;
    let state = Arc::new(AppState::new(store, config.default_limit()?));

    let addr = config.bind_addr()?;
    let socket = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    listener::serve(socket, state, shutdown_signal())
        .await
        .context("Server error")?;

    info!("hookfeed shut down gracefully");
    Ok(())
}

async fn recent(config: &ServiceConfig, limit: Option<i64>) -> Result<()> {
    let query = QueryService::new(open_store(config)?);
    let records = match limit {
        Some(limit) => query.recent(limit).await?,
        None => query.recent_validated(config.default_limit()?).await?,
    };

    let mut out = std::io::stdout().lock();
    for record in &records {
        serde_json::to_writer(&mut out, record)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Builds the configured store.
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn EventStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let store = SqliteEventStore::open(&config.store.path).with_context(|| {
                format!("Failed to open event store at {}", config.store.path.display())
            })?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("using in-memory event store; events are lost on exit");
            Ok(Arc::new(MemoryEventStore::new()))
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
