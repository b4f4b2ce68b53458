//! Configuration tests
//!
//! The round-trip tests guard the template: when a field is added to
//! `Config` but not to `to_toml()` (or vice versa), they fail.

use super::*;
use std::collections::HashMap;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn parse(toml_str: &str) -> FileConfig {
    Config::parse_file_config(toml_str, PathBuf::from("config.toml")).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );
}

#[test]
fn test_config_roundtrip_preserves_values() {
    let mut config = Config::default();
    config.api_url = "https://dialer.internal:9000".to_string();
    config.request_timeout_secs = 4;
    config.retry_delay_ms = 250;
    config.status.poll_interval_ms = 2500;
    config.status.max_failures = 5;
    config.leads.stale_secs = 30;
    config.campaigns.retries = 0;
    config.logging.file_enabled = true;
    config.logging.file_rotation = LogRotation::Hourly;

    let file = parse(&config.to_toml());
    let loaded = Config::resolve(file, no_env).unwrap();

    assert_eq!(loaded.api_url, config.api_url);
    assert_eq!(loaded.request_timeout_secs, 4);
    assert_eq!(loaded.retry_delay_ms, 250);
    assert_eq!(loaded.status, config.status);
    assert_eq!(loaded.leads, config.leads);
    assert_eq!(loaded.campaigns, config.campaigns);
    assert!(loaded.logging.file_enabled);
    assert_eq!(loaded.logging.file_rotation, LogRotation::Hourly);
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_defaults_match_sync_policies() {
    let config = Config::resolve(FileConfig::default(), no_env).unwrap();
    let settings = config.engine_settings();

    assert_eq!(config.api_url, "http://127.0.0.1:8000");
    assert_eq!(settings.status.poll_interval, Duration::from_millis(1000));
    assert_eq!(settings.status.max_failures, 3);
    assert_eq!(settings.leads.stale_time, Duration::from_secs(120));
    assert_eq!(settings.leads.retries, 2);
    assert_eq!(settings.campaigns.stale_time, Duration::from_secs(300));
    assert_eq!(settings.campaigns.retries, 2);
    assert_eq!(settings, EngineSettings::default());
}

#[test]
fn test_env_overrides_file() {
    let file = parse("api_url = \"http://from-file:8000\"\nrequest_timeout_secs = 3\n");
    let env = env_from(&[
        ("DIALDECK_API_URL", "http://from-env:8000/"),
        ("DIALDECK_NO_TUI", "1"),
    ]);
    let config = Config::resolve(file, env).unwrap();

    assert_eq!(config.api_url, "http://from-env:8000");
    assert_eq!(config.request_timeout_secs, 3);
    assert!(!config.enable_tui);
}

#[test]
fn test_partial_sections_keep_defaults() {
    let file = parse("[leads]\nstale_secs = 10\n\n[status]\nmax_failures = 6\n");
    let config = Config::resolve(file, no_env).unwrap();

    assert_eq!(config.leads.stale_secs, 10);
    assert_eq!(config.leads.retries, 2);
    assert_eq!(config.status.poll_interval_ms, 1000);
    assert_eq!(config.status.max_failures, 6);
    assert_eq!(config.campaigns, CacheConfig::campaigns_default());
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_key_is_a_parse_error() {
    let err = Config::parse_file_config("poll_intervall = 5\n", PathBuf::from("c.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.path(), Some(&PathBuf::from("c.toml")));
}

#[test]
fn test_invalid_values_are_rejected() {
    let zero_poll = parse("[status]\npoll_interval_ms = 0\n");
    assert!(matches!(
        Config::resolve(zero_poll, no_env),
        Err(ConfigError::Invalid(_))
    ));

    let bad_url = env_from(&[("DIALDECK_API_URL", "dialer:8000")]);
    assert!(matches!(
        Config::resolve(FileConfig::default(), bad_url),
        Err(ConfigError::Invalid(_))
    ));

    let bad_timeout = env_from(&[("DIALDECK_REQUEST_TIMEOUT_SECS", "soon")]);
    assert!(matches!(
        Config::resolve(FileConfig::default(), bad_timeout),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_log_rotation_parse() {
    assert_eq!(LogRotation::parse("HOURLY"), LogRotation::Hourly);
    assert_eq!(LogRotation::parse("never"), LogRotation::Never);
    assert_eq!(LogRotation::parse("weekly"), LogRotation::Daily);
}
