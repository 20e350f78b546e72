//! Tests for path utilities

use taskloom_config::paths::{ensure_dir, expand_home};
use taskloom_config::{config_path, data_dir, state_path, workspace_path};
use std::path::PathBuf;

#[test]
fn test_paths_live_under_data_dir() {
    let root = data_dir();
    assert!(root.ends_with(".taskloom"));
    assert_eq!(config_path(), root.join("config.json"));
    assert_eq!(workspace_path(), root.join("workspace"));
    assert_eq!(state_path(), root.join("state"));
}

#[test]
fn test_expand_home() {
    let home = dirs::home_dir().expect("home dir");

    assert_eq!(expand_home("~/x/y"), home.join("x/y"));
    assert_eq!(expand_home("~"), home);
    assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    assert_eq!(expand_home("relative"), PathBuf::from("relative"));
}

#[tokio::test]
async fn test_ensure_dir_creates_nested() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b").join("c");

    ensure_dir(&nested).await.unwrap();
    assert!(nested.is_dir());

    // idempotent
    ensure_dir(&nested).await.unwrap();
}
