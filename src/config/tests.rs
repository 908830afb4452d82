use std::io::Write as _;

use clap::Parser;
use serial_test::serial;

use super::*;

const PORT_VAR: &str = "SAFECIRCLE__SERVER__PUBLIC_PORT";
const LEVEL_VAR: &str = "SAFECIRCLE__LOGGING__LEVEL";

struct EnvGuard(&'static [&'static str]);

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in self.0 {
            // SAFETY: env-mutating tests are serialized with `#[serial]`.
            unsafe { std::env::remove_var(key) };
        }
    }
}

fn set_env(key: &'static str, value: &str) {
    // SAFETY: env-mutating tests are serialized with `#[serial]`.
    unsafe { std::env::set_var(key, value) };
}

fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("safecircle-{}-{name}.toml", std::process::id()));
    let mut file = std::fs::File::create(&path).expect("create config file");
    file.write_all(contents.as_bytes()).expect("write config file");
    path
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
#[serial]
fn file_then_environment_then_cli() {
    let path = write_config(
        "precedence",
        "[server]\npublic_port = 4000\n\n[logging]\nlevel = \"warn\"\n\n[site]\nurl = \"https://safecircle.tech/\"\n",
    );
    let _guard = EnvGuard(&[PORT_VAR, LEVEL_VAR]);
    set_env(PORT_VAR, "4100");

    let args = CliArgs::parse_from([
        "safecircle-site",
        "--config-file",
        path.to_str().expect("utf-8 path"),
        "serve",
        "--log-level",
        "trace",
    ]);
    let settings = load(&args).expect("settings load");

    assert_eq!(settings.server.public_addr.port(), 4100);
    assert_eq!(settings.logging.level, LevelFilter::TRACE);
    assert_eq!(settings.site.url, "https://safecircle.tech");

    let _ = std::fs::remove_file(path);
}

#[test]
#[serial]
fn environment_overrides_file_without_cli() {
    let path = write_config("env", "[logging]\nlevel = \"warn\"\n");
    let _guard = EnvGuard(&[LEVEL_VAR]);
    set_env(LEVEL_VAR, "error");

    let args = CliArgs::parse_from([
        "safecircle-site",
        "--config-file",
        path.to_str().expect("utf-8 path"),
    ]);
    let settings = load(&args).expect("settings load");
    assert_eq!(settings.logging.level, LevelFilter::ERROR);

    let _ = std::fs::remove_file(path);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn defaults_are_usable_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.site.default_locale, Locale::En);
    assert_eq!(settings.integrations.timeout, Duration::from_secs(5));
    assert_eq!(settings.integrations.github.repository, "safecircleia/demo");
    assert!(settings.integrations.purge.is_none());
    assert!(settings.site.draft_secret.is_none());
    assert!(settings.cache.enable_data_cache);
    assert_eq!(settings.cache.data_entry_limit.get(), DEFAULT_DATA_ENTRY_LIMIT);

    let analytics = settings.analytics.expect("analytics on by default");
    assert_eq!(analytics.website_id, DEFAULT_UMAMI_WEBSITE_ID);
}

#[test]
fn analytics_can_be_disabled() {
    let mut raw = RawSettings::default();
    raw.analytics.enabled = Some(false);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.analytics.is_none());
}

#[test]
fn blank_secrets_count_as_unset() {
    let mut raw = RawSettings::default();
    raw.site.draft_secret = Some("   ".into());
    raw.integrations.resend.audience_id = Some(String::new());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.site.draft_secret.is_none());
    assert!(settings.integrations.resend.audience_id.is_none());
}

#[test]
fn rejects_unknown_default_locale() {
    let mut raw = RawSettings::default();
    raw.site.default_locale = Some("de".into());
    let err = Settings::from_raw(raw).expect_err("locale rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "site.default_locale",
            ..
        }
    ));
}

#[test]
fn rejects_zero_integration_timeout() {
    let mut raw = RawSettings::default();
    raw.integrations.timeout_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn rejects_malformed_repository() {
    let mut raw = RawSettings::default();
    raw.integrations.github.repository = Some("safecircleia".into());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn purge_webhook_is_optional_but_validated() {
    let mut raw = RawSettings::default();
    raw.integrations.purge.webhook_url = Some("https://cdn.example.com/purge".into());
    let settings = Settings::from_raw(raw).expect("valid settings");
    let purge = settings.integrations.purge.expect("purge configured");
    assert_eq!(purge.webhook_url.host_str(), Some("cdn.example.com"));

    let mut raw = RawSettings::default();
    raw.integrations.purge.webhook_url = Some("not a url".into());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cache_settings_can_be_overridden_via_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache_data: Some(false),
        cache_responses: Some(false),
        ..Default::default()
    };
    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!settings.cache.enable_data_cache);
    assert!(!settings.cache.enable_response_cache);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["safecircle-site"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_prerender_arguments() {
    let args = CliArgs::parse_from([
        "safecircle-site",
        "prerender",
        "--database-url",
        "postgres://example",
        "--concurrency",
        "8",
    ]);

    match args.command.expect("prerender command") {
        Command::Prerender(prerender) => {
            assert_eq!(
                prerender.database.database_url.as_deref(),
                Some("postgres://example")
            );
            assert_eq!(prerender.concurrency, 8);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "safecircle-site",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--cache-responses",
        "off",
        "--database-url",
        "postgres://override",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.cache_responses, Some(false));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
