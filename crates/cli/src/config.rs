//! Service configuration.

use std::{
    collections::HashMap,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use feed::RecentLimit;
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides, e.g. `HOOKFEED__SERVER__PORT=6000`.
pub const ENV_PREFIX: &str = "HOOKFEED";

/// Config file read when `--config` is not given. Optional.
pub const DEFAULT_CONFIG_FILE: &str = "hookfeed.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Storage backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Durable SQLite file at `store.path`.
    #[default]
    Sqlite,
    /// Process-local; lost on exit.
    Memory,
}

/// Event store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Polling API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Events returned when a poll omits `limit`.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// OTLP gRPC endpoint. Span export is off when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            otlp_endpoint: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_store_path() -> PathBuf {
    PathBuf::from("hookfeed.db")
}

fn default_limit() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    /// Loads configuration from `path` (or [`DEFAULT_CONFIG_FILE`] if present)
    /// and `HOOKFEED__*` environment variables.
    ///
    /// An explicit `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(path, None)
    }

    /// Like [`ServiceConfig::load`], reading environment overrides from `env`
    /// instead of the process environment when given.
    pub fn from_sources(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("Failed to read configuration")?;

        let service_config: ServiceConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        service_config.validate()?;
        Ok(service_config)
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("Invalid port: 0");
        }
        if self.query.default_limit == 0 {
            bail!("query.default_limit must be at least 1");
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.as_os_str().is_empty() {
            bail!("store.path must be set for the sqlite backend");
        }
        Ok(())
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| format!("Invalid server address {}:{}", self.server.host, self.server.port))
    }

    /// The default poll limit as a validated value.
    pub fn default_limit(&self) -> Result<RecentLimit> {
        RecentLimit::new(self.query.default_limit)
            .context("query.default_limit must be at least 1")
    }
}
