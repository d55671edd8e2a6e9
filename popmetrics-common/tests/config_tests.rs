//! Unit tests for configuration loading and resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate POPMETRICS_* variables are marked with #[serial].

use popmetrics_common::config::{
    load_toml_config, resolve_path, resolve_string, write_toml_config, HttpSection, TomlConfig,
};
use popmetrics_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_toml_config(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.http, HttpSection::default());
}

#[test]
fn test_partial_config_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("popmetrics.toml");
    std::fs::write(
        &path,
        r#"
database_path = "/data/tracker.sqlite"

[spotify]
client_id = "abc"

[http]
max_retries = 2
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.database_path, Some(PathBuf::from("/data/tracker.sqlite")));
    assert_eq!(config.spotify.client_id.as_deref(), Some("abc"));
    assert_eq!(config.spotify.client_secret, None);
    assert_eq!(config.http.max_retries, 2);
    assert_eq!(config.http.timeout_secs, 20);
}

#[test]
fn test_malformed_config_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("popmetrics.toml");
    std::fs::write(&path, "database_path = [not toml").unwrap();

    let result = load_toml_config(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_write_then_load_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("popmetrics.toml");

    let mut config = TomlConfig::default();
    config.build_version = Some("abc123".to_string());
    config.youtube.api_key = Some("yt-key".to_string());

    write_toml_config(&config, &path).unwrap();
    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
#[serial]
fn test_resolve_path_priority_order() {
    let default = Path::new("/default.sqlite");
    let toml = Path::new("/toml.sqlite");
    let cli = Path::new("/cli.sqlite");

    env::remove_var("POPMETRICS_TEST_DB");
    assert_eq!(
        resolve_path(None, "POPMETRICS_TEST_DB", None, default),
        PathBuf::from("/default.sqlite")
    );
    assert_eq!(
        resolve_path(None, "POPMETRICS_TEST_DB", Some(toml), default),
        PathBuf::from("/toml.sqlite")
    );

    env::set_var("POPMETRICS_TEST_DB", "/env.sqlite");
    assert_eq!(
        resolve_path(None, "POPMETRICS_TEST_DB", Some(toml), default),
        PathBuf::from("/env.sqlite")
    );
    assert_eq!(
        resolve_path(Some(cli), "POPMETRICS_TEST_DB", Some(toml), default),
        PathBuf::from("/cli.sqlite")
    );

    env::remove_var("POPMETRICS_TEST_DB");
}

#[test]
#[serial]
fn test_resolve_string_skips_blank_values() {
    env::set_var("POPMETRICS_TEST_A", "   ");
    env::set_var("POPMETRICS_TEST_B", "from-env");

    assert_eq!(
        resolve_string(&["POPMETRICS_TEST_A", "POPMETRICS_TEST_B"], Some("from-toml")),
        Some("from-env".to_string())
    );

    env::remove_var("POPMETRICS_TEST_B");
    assert_eq!(
        resolve_string(&["POPMETRICS_TEST_A", "POPMETRICS_TEST_B"], Some("from-toml")),
        Some("from-toml".to_string())
    );
    assert_eq!(
        resolve_string(&["POPMETRICS_TEST_A"], Some("  ")),
        None
    );

    env::remove_var("POPMETRICS_TEST_A");
}
