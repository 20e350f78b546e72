//! Tests for Config serialization, defaults and loading

use serial_test::serial;
use taskloom_config::{Config, OperationConfig, RetryConfig, API_KEY_ENV};
use std::time::Duration;
use tempfile::TempDir;

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.agent.defaults.workspace, "~/.taskloom/workspace");
    assert_eq!(config.agent.defaults.state_dir, "~/.taskloom/state");
    assert_eq!(config.agent.defaults.max_tokens, 8192);
    assert!(config.provider.api_key.is_empty());
    assert!(config.provider.api_base.is_none());

    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.delay_secs, 30);
    assert_eq!(config.retry.attempt_timeout_secs, 180);
    assert_eq!(config.operation.max_rounds, 30);
    assert_eq!(config.tools.exec_timeout_secs, 60);
}

#[test]
fn test_retry_durations() {
    let retry = RetryConfig {
        max_attempts: 2,
        delay_secs: 3,
        attempt_timeout_secs: 7,
    };
    assert_eq!(retry.delay(), Duration::from_secs(3));
    assert_eq!(retry.attempt_timeout(), Duration::from_secs(7));
}

#[test]
fn test_partial_json_uses_defaults() {
    let json = r#"{ "operation": { "max_rounds": 4 }, "provider": { "api_key": "k" } }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.max_rounds(), 4);
    assert_eq!(config.provider.api_key, "k");
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.agent.defaults.model, Config::default().default_model());
}

#[test]
fn test_empty_json_is_default() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config.operation.max_rounds, OperationConfig::default().max_rounds);
}

#[tokio::test]
async fn test_load_missing_file_returns_defaults() {
    let dir = temp_dir();
    let config = Config::load_from(&dir.path().join("missing.json"))
        .await
        .unwrap();
    assert_eq!(config.retry.max_attempts, 5);
}

#[tokio::test]
async fn test_save_and_load_roundtrip() {
    let dir = temp_dir();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.agent.defaults.model = "test/model".to_string();
    config.operation.max_rounds = 12;
    config.provider.api_base = Some("http://localhost:8080/v1".to_string());
    config.save_to(&path).await.unwrap();

    let loaded = Config::load_from(&path).await.unwrap();
    assert_eq!(loaded.default_model(), "test/model");
    assert_eq!(loaded.max_rounds(), 12);
    assert_eq!(loaded.api_base().as_deref(), Some("http://localhost:8080/v1"));
}

#[tokio::test]
async fn test_load_invalid_json_fails() {
    let dir = temp_dir();
    let path = dir.path().join("config.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    assert!(Config::load_from(&path).await.is_err());
}

#[test]
fn test_workspace_and_state_paths_expand_home() {
    let config = Config::default();
    let home = dirs::home_dir().expect("home dir");
    assert_eq!(config.workspace_path(), home.join(".taskloom/workspace"));
    assert_eq!(config.state_path(), home.join(".taskloom/state"));

    let mut config = Config::default();
    config.agent.defaults.state_dir = "/tmp/taskloom-state".to_string();
    assert_eq!(
        config.state_path(),
        std::path::PathBuf::from("/tmp/taskloom-state")
    );
}

#[test]
fn test_empty_api_base_is_none() {
    let mut config = Config::default();
    config.provider.api_base = Some(String::new());
    assert!(config.api_base().is_none());
}

#[test]
#[serial]
fn test_api_key_from_file() {
    std::env::remove_var(API_KEY_ENV);
    let mut config = Config::default();
    assert!(!config.has_api_key());

    config.provider.api_key = "file-key".to_string();
    assert_eq!(config.api_key().as_deref(), Some("file-key"));
}

#[test]
#[serial]
fn test_api_key_env_overrides_file() {
    std::env::set_var(API_KEY_ENV, "env-key");
    let mut config = Config::default();
    config.provider.api_key = "file-key".to_string();

    assert_eq!(config.api_key().as_deref(), Some("env-key"));
    std::env::remove_var(API_KEY_ENV);
}
