//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::entity::EntityKind;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides, ServiceKind};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "reelhouse";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DB_STATEMENT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CACHE_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_CACHE_OPERATION_TIMEOUT_MS: u64 = 500;
const DEFAULT_CACHE_POOL_SIZE: u64 = 16;
const DEFAULT_EVENT_BROKERS: &str = "127.0.0.1:9092";
const DEFAULT_EVENT_QUEUE_CAPACITY: u64 = 1024;
const DEFAULT_EVENT_CONCURRENCY: u64 = 4;
const DEFAULT_EVENT_DELIVERY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BOOTSTRAP_MAX_ATTEMPTS: u64 = 10;
const DEFAULT_BOOTSTRAP_INTERVAL_MS: u64 = 2_000;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: EntityKind,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub events: EventSettings,
    pub bootstrap: BootstrapSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: NonZeroU32,
    pub acquire_timeout: Duration,
    /// Upper bound for a single store call made by an entity service.
    pub statement_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub url: String,
    pub ttl: Duration,
    pub operation_timeout: Duration,
    pub pool_size: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct EventSettings {
    pub brokers: String,
    pub topic: String,
    pub queue_capacity: NonZeroUsize,
    pub concurrency: NonZeroUsize,
    pub delivery_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub max_attempts: NonZeroU32,
    pub interval: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("REELHOUSE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    let service = match &cli.command {
        Command::Serve(args) => {
            raw.apply_serve_overrides(&args.overrides);
            args.service.entity_kind()
        }
    };

    Settings::from_raw(raw, service)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    events: RawEventSettings,
    bootstrap: RawBootstrapSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(url) = overrides.cache_url.as_ref() {
            self.cache.url = Some(url.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(brokers) = overrides.events_brokers.as_ref() {
            self.events.brokers = Some(brokers.clone());
        }
        if let Some(topic) = overrides.events_topic.as_ref() {
            self.events.topic = Some(topic.clone());
        }
        if let Some(attempts) = overrides.bootstrap_max_attempts {
            self.bootstrap.max_attempts = Some(attempts.into());
        }
        if let Some(interval) = overrides.bootstrap_interval_ms {
            self.bootstrap.interval_ms = Some(interval);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings, service: EntityKind) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            events,
            bootstrap,
        } = raw;

        let server = build_server_settings(server, service)?;
        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let cache = build_cache_settings(cache)?;
        let events = build_event_settings(events, service)?;
        let bootstrap = build_bootstrap_settings(bootstrap)?;

        Ok(Self {
            service,
            server,
            logging,
            database,
            cache,
            events,
            bootstrap,
        })
    }
}

fn build_server_settings(
    server: RawServerSettings,
    service: EntityKind,
) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(service.default_port());
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    let graceful_shutdown = non_zero_duration(
        Duration::from_secs(graceful_secs),
        "server.graceful_shutdown_seconds",
    )?;

    Ok(ServerSettings {
        addr,
        graceful_shutdown,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_empty(database.url)
        .ok_or_else(|| LoadError::invalid("database.url", "a connection URL is required"))?;

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    let acquire_timeout = non_zero_duration(
        Duration::from_secs(
            database
                .acquire_timeout_seconds
                .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
        ),
        "database.acquire_timeout_seconds",
    )?;

    let statement_timeout = non_zero_duration(
        Duration::from_millis(
            database
                .statement_timeout_ms
                .unwrap_or(DEFAULT_DB_STATEMENT_TIMEOUT_MS),
        ),
        "database.statement_timeout_ms",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
        acquire_timeout,
        statement_timeout,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let url = non_empty(cache.url).unwrap_or_else(|| DEFAULT_CACHE_URL.to_string());

    let ttl = non_zero_duration(
        Duration::from_secs(cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS)),
        "cache.ttl_seconds",
    )?;

    let operation_timeout = non_zero_duration(
        Duration::from_millis(
            cache
                .operation_timeout_ms
                .unwrap_or(DEFAULT_CACHE_OPERATION_TIMEOUT_MS),
        ),
        "cache.operation_timeout_ms",
    )?;

    let pool_size = non_zero_usize(
        cache.pool_size.unwrap_or(DEFAULT_CACHE_POOL_SIZE),
        "cache.pool_size",
    )?;

    Ok(CacheSettings {
        url,
        ttl,
        operation_timeout,
        pool_size,
    })
}

fn build_event_settings(
    events: RawEventSettings,
    service: EntityKind,
) -> Result<EventSettings, LoadError> {
    let brokers = non_empty(events.brokers).unwrap_or_else(|| DEFAULT_EVENT_BROKERS.to_string());
    let topic =
        non_empty(events.topic).unwrap_or_else(|| service.default_topic().to_string());

    let queue_capacity = non_zero_usize(
        events.queue_capacity.unwrap_or(DEFAULT_EVENT_QUEUE_CAPACITY),
        "events.queue_capacity",
    )?;
    let concurrency = non_zero_usize(
        events.concurrency.unwrap_or(DEFAULT_EVENT_CONCURRENCY),
        "events.concurrency",
    )?;
    let delivery_timeout = non_zero_duration(
        Duration::from_millis(
            events
                .delivery_timeout_ms
                .unwrap_or(DEFAULT_EVENT_DELIVERY_TIMEOUT_MS),
        ),
        "events.delivery_timeout_ms",
    )?;

    Ok(EventSettings {
        brokers,
        topic,
        queue_capacity,
        concurrency,
        delivery_timeout,
    })
}

fn build_bootstrap_settings(
    bootstrap: RawBootstrapSettings,
) -> Result<BootstrapSettings, LoadError> {
    let max_attempts = non_zero_u32(
        bootstrap
            .max_attempts
            .unwrap_or(DEFAULT_BOOTSTRAP_MAX_ATTEMPTS),
        "bootstrap.max_attempts",
    )?;

    // A zero interval is allowed: probes then run back to back.
    let interval = Duration::from_millis(
        bootstrap
            .interval_ms
            .unwrap_or(DEFAULT_BOOTSTRAP_INTERVAL_MS),
    );

    Ok(BootstrapSettings {
        max_attempts,
        interval,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_seconds: Option<u64>,
    statement_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    url: Option<String>,
    ttl_seconds: Option<u64>,
    operation_timeout_ms: Option<u64>,
    pool_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEventSettings {
    brokers: Option<String>,
    topic: Option<String>,
    queue_capacity: Option<u64>,
    concurrency: Option<u64>,
    delivery_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBootstrapSettings {
    max_attempts: Option<u64>,
    interval_ms: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value_usize: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value_usize).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_duration(value: Duration, key: &'static str) -> Result<Duration, LoadError> {
    if value.is_zero() {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
