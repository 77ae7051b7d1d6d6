use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};

use crate::domain::entity::EntityKind;

/// Command-line arguments for the Reelhouse binary.
#[derive(Debug, Parser)]
#[command(name = "reelhouse", version, about = "Reelhouse catalog services")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "REELHOUSE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run one entity service over HTTP.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    /// Which entity service to run.
    #[arg(value_enum)]
    pub service: ServiceKind,

    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceKind {
    Movies,
    Users,
}

impl ServiceKind {
    pub const fn entity_kind(self) -> EntityKind {
        match self {
            ServiceKind::Movies => EntityKind::Movie,
            ServiceKind::Users => EntityKind::User,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the Redis connection URL.
    #[arg(long = "cache-url", value_name = "URL")]
    pub cache_url: Option<String>,

    /// Override the snapshot expiry.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the Kafka bootstrap servers.
    #[arg(long = "events-brokers", value_name = "HOSTS")]
    pub events_brokers: Option<String>,

    /// Override the topic that receives mutation events.
    #[arg(long = "events-topic", value_name = "TOPIC")]
    pub events_topic: Option<String>,

    /// Override how many times each dependency is probed at startup.
    #[arg(long = "bootstrap-max-attempts", value_name = "COUNT")]
    pub bootstrap_max_attempts: Option<u32>,

    /// Override the pause between startup probes.
    #[arg(long = "bootstrap-interval-ms", value_name = "MILLIS")]
    pub bootstrap_interval_ms: Option<u64>,
}
