use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the SafeCircle site binary.
#[derive(Debug, Parser)]
#[command(
    name = "safecircle-site",
    version,
    about = "SafeCircle localized site server"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SAFECIRCLE_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and admin HTTP listeners.
    Serve(Box<ServeArgs>),
    /// Render every published path once and report failures.
    #[command(name = "prerender")]
    Prerender(PrerenderArgs),
    /// Apply pending database migrations and exit.
    #[command(name = "migrate")]
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct PrerenderArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Maximum number of paths rendered concurrently.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(usize))]
    pub concurrency: usize,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

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

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the public base URL used in sitemaps and Open Graph tags.
    #[arg(long = "site-url", value_name = "URL")]
    pub site_url: Option<String>,

    /// Toggle the content query cache.
    #[arg(
        long = "cache-data",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_data: Option<bool>,

    /// Toggle the rendered response cache.
    #[arg(
        long = "cache-responses",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_responses: Option<bool>,

    /// Override the timeout applied to every outbound integration call.
    #[arg(long = "integrations-timeout-seconds", value_name = "SECONDS")]
    pub integrations_timeout_seconds: Option<u64>,
}
