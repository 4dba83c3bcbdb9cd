//! Config file resolution against real files on disk

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use xkmini_common::config::{AppConfig, ConfigOverrides};
use xkmini_common::Error;

#[test]
fn test_resolve_reads_named_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("xkmini.toml");
    std::fs::write(
        &path,
        r#"
        bind = "0.0.0.0"
        port = 9300
        log_file = "/var/log/xkmini/app.log"
        upstream_timeout_secs = 2

        [retry]
        max_attempts = 7
        "#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        db_path: Some(PathBuf::from("/tmp/override.sqlite")),
        ..Default::default()
    };
    let config = AppConfig::resolve(overrides, Some(&path)).unwrap();

    assert_eq!(config.bind, "0.0.0.0");
    assert_eq!(config.port, 9300);
    assert_eq!(config.db_path, PathBuf::from("/tmp/override.sqlite"));
    assert_eq!(config.log_file, PathBuf::from("/var/log/xkmini/app.log"));
    assert_eq!(config.upstream_timeout, Duration::from_secs(2));
    assert_eq!(config.retry.max_attempts, 7);
    assert_eq!(config.retry.backoff, Duration::from_millis(200));
}

#[test]
fn test_resolve_rejects_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let err = AppConfig::resolve(ConfigOverrides::default(), Some(&path)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_zero_timeout_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("xkmini.toml");
    std::fs::write(&path, "upstream_timeout_secs = 0").unwrap();

    assert!(AppConfig::resolve(ConfigOverrides::default(), Some(&path)).is_err());
}
