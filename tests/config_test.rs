use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use kiosk_rs::config::Config;
use kiosk_rs::error::Error;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

fn temp_file(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("kiosk-config-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn config_defaults_when_nothing_is_set() {
    let config = Config::from_lookup(lookup(&[])).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.db_path, None);
    assert_eq!(config.log_level, "info");

    let kitchen = config.kitchen_config();
    assert_eq!(kitchen.serving_duration, Duration::from_secs(10));
    assert_eq!(kitchen.pool_size, 1);
    assert_eq!(kitchen.poll_interval, Duration::from_millis(100));
}

#[test]
fn config_reads_overrides() {
    let config = Config::from_lookup(lookup(&[
        ("KIOSK_DB_PATH", "/var/lib/kiosk/kiosk.db"),
        ("KIOSK_SERVING_MS", "250"),
        ("KIOSK_COOKS", "4"),
        ("KIOSK_POLL_MS", "20"),
        ("OTEL_ENDPOINT", "http://localhost:4317"),
        ("LOG_LEVEL", "debug"),
    ]))
    .unwrap();

    assert_eq!(config.db_path, Some(PathBuf::from("/var/lib/kiosk/kiosk.db")));
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(config.log_level, "debug");

    let kitchen = config.kitchen_config();
    assert_eq!(kitchen.serving_duration, Duration::from_millis(250));
    assert_eq!(kitchen.pool_size, 4);
    assert_eq!(kitchen.poll_interval, Duration::from_millis(20));
}

#[test]
fn config_rejects_malformed_numbers() {
    let err = Config::from_lookup(lookup(&[("KIOSK_COOKS", "many")])).unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("KIOSK_COOKS")));
}

#[test]
fn config_rejects_zero_durations() {
    assert!(Config::from_lookup(lookup(&[("KIOSK_SERVING_MS", "0")])).is_err());
    assert!(Config::from_lookup(lookup(&[("KIOSK_POLL_MS", "0")])).is_err());
}

#[test]
fn config_from_env_loads() {
    // Only reads variables this crate owns; unset ones fall back to defaults.
    let config = Config::from_env().unwrap();
    assert!(!config.log_level.is_empty());
}

#[test]
fn config_from_toml_file_fills_missing_keys_with_defaults() {
    let path = temp_file(
        "kiosk.toml",
        r#"
db_path = "kiosk.db"
serving_ms = 5000
cooks = 3
"#,
    );

    let config = Config::from_toml_file(&path).unwrap();

    assert_eq!(config.db_path, Some(PathBuf::from("kiosk.db")));
    assert_eq!(config.serving_ms, 5000);
    assert_eq!(config.cooks, 3);
    assert_eq!(config.poll_ms, Config::default().poll_ms);
    assert_eq!(config.log_level, "info");

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn config_from_toml_file_rejects_unknown_keys() {
    let path = temp_file("kiosk.toml", "chefs = 3\n");

    let err = Config::from_toml_file(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn config_from_missing_toml_file_is_io_error() {
    let err = Config::from_toml_file("/nonexistent/kiosk.toml").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
