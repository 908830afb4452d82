//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::types::Locale;

mod cli;
#[cfg(test)]
mod tests;

pub use cli::{
    CliArgs, Command, DatabaseOverride, MigrateArgs, PrerenderArgs, ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "safecircle";
const ENV_PREFIX: &str = "SAFECIRCLE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_ADMIN_PORT: u16 = 3001;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_DATA_ENTRY_LIMIT: usize = 2_000;
const DEFAULT_RESPONSE_ENTRY_LIMIT: usize = 500;
const DEFAULT_DATA_TTL_SECS: u64 = 3_600;
const DEFAULT_RESPONSE_TTL_SECS: u64 = 3_600;
const DEFAULT_INTEGRATION_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RESEND_BASE_URL: &str = "https://api.resend.com";
const DEFAULT_TURNSTILE_VERIFY_URL: &str =
    "https://challenges.cloudflare.com/turnstile/v0/siteverify";
const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const DEFAULT_GITHUB_REPOSITORY: &str = "safecircleia/demo";
const DEFAULT_UMAMI_WEBSITE_ID: &str = "56bc82f8-7a54-4555-a9d9-4ee36bbbfe4c";
const DEFAULT_UMAMI_SCRIPT_SRC: &str = "https://analytics.tomasps.com/script.js";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub site: SiteSettings,
    pub cache: CacheSettings,
    pub integrations: IntegrationSettings,
    pub analytics: Option<AnalyticsSettings>,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
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
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Public origin, without a trailing slash.
    pub url: String,
    pub default_locale: Locale,
    /// Shared secret for `/api/draft`; draft mode is unavailable without it.
    pub draft_secret: Option<String>,
    /// Bearer token for the admin listener; admin routes reject every request without it.
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enable_data_cache: bool,
    pub enable_response_cache: bool,
    pub data_entry_limit: NonZeroUsize,
    pub response_entry_limit: NonZeroUsize,
    pub data_ttl: Duration,
    pub response_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct IntegrationSettings {
    /// Applied to every outbound call.
    pub timeout: Duration,
    pub resend: ResendSettings,
    pub turnstile: TurnstileSettings,
    pub github: GithubSettings,
    pub purge: Option<PurgeSettings>,
}

#[derive(Debug, Clone)]
pub struct ResendSettings {
    pub api_key: Option<String>,
    pub audience_id: Option<String>,
    pub base_url: Url,
}

#[derive(Debug, Clone)]
pub struct TurnstileSettings {
    pub secret_key: Option<String>,
    pub site_key: Option<String>,
    pub verify_url: Url,
}

#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub token: Option<String>,
    /// `owner/name`.
    pub repository: String,
    pub api_base: Url,
}

#[derive(Debug, Clone)]
pub struct PurgeSettings {
    pub webhook_url: Url,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalyticsSettings {
    pub website_id: String,
    pub script_src: String,
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

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Prerender(args)) => raw.apply_database_override(&args.database),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    site: RawSiteSettings,
    cache: RawCacheSettings,
    integrations: RawIntegrationSettings,
    analytics: RawAnalyticsSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
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
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(url) = overrides.site_url.as_ref() {
            self.site.url = Some(url.clone());
        }
        if let Some(enabled) = overrides.cache_data {
            self.cache.enable_data_cache = Some(enabled);
        }
        if let Some(enabled) = overrides.cache_responses {
            self.cache.enable_response_cache = Some(enabled);
        }
        if let Some(seconds) = overrides.integrations_timeout_seconds {
            self.integrations.timeout_seconds = Some(seconds);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            site,
            cache,
            integrations,
            analytics,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            site: build_site_settings(site)?,
            cache: build_cache_settings(cache)?,
            integrations: build_integration_settings(integrations)?,
            analytics: build_analytics_settings(analytics),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
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
    let url = non_blank(database.url);
    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max_connections).ok_or_else(|| {
        LoadError::invalid("database.max_connections", "must be greater than zero")
    })?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let raw_url = non_blank(site.url).unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
    let url = parse_url(&raw_url, "site.url")?;
    let url = url.as_str().trim_end_matches('/').to_string();

    let default_locale = match non_blank(site.default_locale) {
        Some(code) => Locale::from_str(&code)
            .map_err(|_| LoadError::invalid("site.default_locale", format!("unknown locale `{code}`")))?,
        None => Locale::DEFAULT,
    };

    Ok(SiteSettings {
        url,
        default_locale,
        draft_secret: non_blank(site.draft_secret),
        admin_token: non_blank(site.admin_token),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let data_entry_limit = non_zero_usize(
        cache.data_entry_limit.unwrap_or(DEFAULT_DATA_ENTRY_LIMIT),
        "cache.data_entry_limit",
    )?;
    let response_entry_limit = non_zero_usize(
        cache
            .response_entry_limit
            .unwrap_or(DEFAULT_RESPONSE_ENTRY_LIMIT),
        "cache.response_entry_limit",
    )?;

    let data_ttl = cache.data_ttl_seconds.unwrap_or(DEFAULT_DATA_TTL_SECS);
    if data_ttl == 0 {
        return Err(LoadError::invalid(
            "cache.data_ttl_seconds",
            "must be greater than zero",
        ));
    }
    let response_ttl = cache
        .response_ttl_seconds
        .unwrap_or(DEFAULT_RESPONSE_TTL_SECS);
    if response_ttl == 0 {
        return Err(LoadError::invalid(
            "cache.response_ttl_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enable_data_cache: cache.enable_data_cache.unwrap_or(true),
        enable_response_cache: cache.enable_response_cache.unwrap_or(true),
        data_entry_limit,
        response_entry_limit,
        data_ttl: Duration::from_secs(data_ttl),
        response_ttl: Duration::from_secs(response_ttl),
    })
}

fn build_integration_settings(
    integrations: RawIntegrationSettings,
) -> Result<IntegrationSettings, LoadError> {
    let RawIntegrationSettings {
        timeout_seconds,
        resend,
        turnstile,
        github,
        purge,
    } = integrations;

    let timeout_seconds = timeout_seconds.unwrap_or(DEFAULT_INTEGRATION_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "integrations.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let resend = ResendSettings {
        api_key: non_blank(resend.api_key),
        audience_id: non_blank(resend.audience_id),
        base_url: parse_url(
            &non_blank(resend.base_url).unwrap_or_else(|| DEFAULT_RESEND_BASE_URL.to_string()),
            "integrations.resend.base_url",
        )?,
    };

    let turnstile = TurnstileSettings {
        secret_key: non_blank(turnstile.secret_key),
        site_key: non_blank(turnstile.site_key),
        verify_url: parse_url(
            &non_blank(turnstile.verify_url)
                .unwrap_or_else(|| DEFAULT_TURNSTILE_VERIFY_URL.to_string()),
            "integrations.turnstile.verify_url",
        )?,
    };

    let repository =
        non_blank(github.repository).unwrap_or_else(|| DEFAULT_GITHUB_REPOSITORY.to_string());
    if repository.split('/').filter(|part| !part.is_empty()).count() != 2 {
        return Err(LoadError::invalid(
            "integrations.github.repository",
            format!("expected `owner/name`, got `{repository}`"),
        ));
    }
    let github = GithubSettings {
        token: non_blank(github.token),
        repository,
        api_base: parse_url(
            &non_blank(github.api_base).unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string()),
            "integrations.github.api_base",
        )?,
    };

    let purge = match non_blank(purge.webhook_url) {
        Some(raw) => Some(PurgeSettings {
            webhook_url: parse_url(&raw, "integrations.purge.webhook_url")?,
            token: non_blank(purge.token),
        }),
        None => None,
    };

    Ok(IntegrationSettings {
        timeout: Duration::from_secs(timeout_seconds),
        resend,
        turnstile,
        github,
        purge,
    })
}

fn build_analytics_settings(analytics: RawAnalyticsSettings) -> Option<AnalyticsSettings> {
    if !analytics.enabled.unwrap_or(true) {
        return None;
    }
    Some(AnalyticsSettings {
        website_id: non_blank(analytics.website_id)
            .unwrap_or_else(|| DEFAULT_UMAMI_WEBSITE_ID.to_string()),
        script_src: non_blank(analytics.script_src)
            .unwrap_or_else(|| DEFAULT_UMAMI_SCRIPT_SRC.to_string()),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
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
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    url: Option<String>,
    default_locale: Option<String>,
    draft_secret: Option<String>,
    admin_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enable_data_cache: Option<bool>,
    enable_response_cache: Option<bool>,
    data_entry_limit: Option<usize>,
    response_entry_limit: Option<usize>,
    data_ttl_seconds: Option<u64>,
    response_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawIntegrationSettings {
    timeout_seconds: Option<u64>,
    resend: RawResendSettings,
    turnstile: RawTurnstileSettings,
    github: RawGithubSettings,
    purge: RawPurgeSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawResendSettings {
    api_key: Option<String>,
    audience_id: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTurnstileSettings {
    secret_key: Option<String>,
    site_key: Option<String>,
    verify_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGithubSettings {
    token: Option<String>,
    repository: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPurgeSettings {
    webhook_url: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAnalyticsSettings {
    enabled: Option<bool>,
    website_id: Option<String>,
    script_src: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(raw: &str, key: &'static str) -> Result<Url, LoadError> {
    Url::parse(raw).map_err(|err| LoadError::invalid(key, format!("invalid url `{raw}`: {err}")))
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    use clap::Parser;

    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
