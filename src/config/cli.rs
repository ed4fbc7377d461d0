use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Folio post index service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the post index over HTTP.
    Serve(Box<ServeArgs>),
    /// Materialize the post index once and print it as JSON.
    Index(IndexArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
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
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverrides {
    /// Override the record store base URL.
    #[arg(long = "store-url", value_name = "URL", conflicts_with = "store_snapshot")]
    pub store_url: Option<String>,

    /// Read records from a JSON snapshot file instead of a remote store.
    #[arg(long = "store-snapshot", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub store_snapshot: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub store: StoreOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override how long a built index is served before it is rebuilt.
    #[arg(long = "revalidate-seconds", value_name = "SECONDS")]
    pub revalidate_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct IndexArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub store: StoreOverrides,

    /// Include drafts and scheduled posts.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub preview: bool,
}
