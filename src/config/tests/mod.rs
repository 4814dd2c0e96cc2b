//! Unit tests for config module
//!
//! Tests settings defaults, TOML parsing and environment overrides.
//! Environment access goes through an injected lookup, never the real env.

#![allow(clippy::panic, clippy::unwrap_used)]

use std::{collections::HashMap, path::PathBuf, time::Duration};

use crate::config::{
    ConfigPaths, DEFAULT_HANDLER_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DEFAULT_STORE_FILE,
    ENV_HANDLER_TIMEOUT_MS, ENV_IDLE_TIMEOUT_MS, ENV_STORE_PATH, SettingsError, StoreSettings,
};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn settings_default() {
    let settings = StoreSettings::default();

    assert_eq!(settings.store_path, PathBuf::from(DEFAULT_STORE_FILE));
    assert_eq!(settings.idle_timeout, DEFAULT_IDLE_TIMEOUT);
    assert_eq!(settings.handler_timeout, DEFAULT_HANDLER_TIMEOUT);
    assert_eq!(ConfigPaths::default_store_file(), settings.store_path);
}

#[test]
fn settings_new_keeps_default_timeout() {
    let settings = StoreSettings::new("/tmp/x.json").with_idle_timeout(Duration::from_millis(5));

    assert_eq!(settings.store_path, PathBuf::from("/tmp/x.json"));
    assert_eq!(settings.idle_timeout, Duration::from_millis(5));
    assert_eq!(settings.handler_timeout, DEFAULT_HANDLER_TIMEOUT);

    let settings = settings.with_handler_timeout(Duration::from_millis(80));
    assert_eq!(settings.handler_timeout, Duration::from_millis(80));
}

#[test]
fn settings_from_toml() {
    let settings = StoreSettings::from_toml_str(
        r#"
store_path = "data/agents.json"
idle_timeout_ms = 250
handler_timeout_ms = 1500
"#,
    )
    .unwrap();

    assert_eq!(settings.store_path, PathBuf::from("data/agents.json"));
    assert_eq!(settings.idle_timeout, Duration::from_millis(250));
    assert_eq!(settings.handler_timeout, Duration::from_millis(1500));
}

#[test]
fn settings_from_empty_toml_uses_defaults() {
    let settings = StoreSettings::from_toml_str("").unwrap();
    assert_eq!(settings, StoreSettings::default());
}

#[test]
fn settings_rejects_unknown_keys() {
    let err = StoreSettings::from_toml_str("storage_file = \"x.json\"").unwrap_err();
    assert!(matches!(err, SettingsError::TomlParseError { .. }));
}

#[test]
fn settings_rejects_zero_timeout() {
    for field in ["idle_timeout_ms", "handler_timeout_ms"] {
        let err = StoreSettings::from_toml_str(&format!("{field} = 0")).unwrap_err();

        match err {
            SettingsError::InvalidValue { field: named, .. } => assert_eq!(named, field),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn env_overrides_file_values() {
    let settings = StoreSettings::from_toml_str("store_path = \"from_file.json\"")
        .unwrap()
        .apply_env(lookup(&[
            (ENV_STORE_PATH, "from_env.json"),
            (ENV_IDLE_TIMEOUT_MS, "40"),
            (ENV_HANDLER_TIMEOUT_MS, "900"),
        ]))
        .unwrap();

    assert_eq!(settings.store_path, PathBuf::from("from_env.json"));
    assert_eq!(settings.idle_timeout, Duration::from_millis(40));
    assert_eq!(settings.handler_timeout, Duration::from_millis(900));
}

#[test]
fn env_without_vars_changes_nothing() {
    let settings = StoreSettings::default().apply_env(lookup(&[])).unwrap();
    assert_eq!(settings, StoreSettings::default());
}

#[test]
fn env_rejects_bad_timeout() {
    let err = StoreSettings::default()
        .apply_env(lookup(&[(ENV_IDLE_TIMEOUT_MS, "soon")]))
        .unwrap_err();

    assert!(matches!(err, SettingsError::InvalidValue { .. }));

    let err = StoreSettings::default()
        .apply_env(lookup(&[(ENV_HANDLER_TIMEOUT_MS, "0")]))
        .unwrap_err();

    match err {
        SettingsError::InvalidValue { field, .. } => assert_eq!(field, ENV_HANDLER_TIMEOUT_MS),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn env_rejects_empty_store_path() {
    let err = StoreSettings::default()
        .apply_env(lookup(&[(ENV_STORE_PATH, "  ")]))
        .unwrap_err();

    assert!(matches!(err, SettingsError::InvalidValue { .. }));
}

#[test]
fn load_file_reports_missing_file() {
    let err = StoreSettings::load_file(std::path::Path::new("/nonexistent/agentcfg.toml"))
        .unwrap_err();

    assert!(matches!(err, SettingsError::IoError { .. }));
}

#[test]
fn load_file_reads_settings() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "idle_timeout_ms = 75\n").unwrap();

    let settings = StoreSettings::load_file(&path).unwrap();
    assert_eq!(settings.idle_timeout, Duration::from_millis(75));
    assert_eq!(settings.store_path, PathBuf::from(DEFAULT_STORE_FILE));
}

#[test]
fn parse_error_names_the_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "store_path = [").unwrap();

    match StoreSettings::load_file(&path).unwrap_err() {
        SettingsError::TomlParseError { location, .. } => {
            assert!(location.ends_with("settings.toml"))
        }
        other => panic!("unexpected error: {other}"),
    }
}
