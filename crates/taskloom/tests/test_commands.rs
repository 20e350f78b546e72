//! Command execution tests for taskloom

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;

// ============================================================================
// Init command tests
// ============================================================================

#[test]
fn test_init_creates_layout() {
    let env = TestEnv::new().expect("Failed to create test environment");

    env.command()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initializing taskloom"))
        .stdout(predicate::str::contains("taskloom initialized"));

    assert!(env.config_file().exists());
    assert!(env.workspace_dir().is_dir());
    assert!(env.state_dir().join("todo").join("refinement").is_dir());
    assert!(env.state_dir().join("operation_history").is_dir());

    let config: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.config_file()).unwrap()).unwrap();
    assert_eq!(config["retry"]["max_attempts"], 5);
    assert_eq!(config["operation"]["max_rounds"], 30);
}

#[test]
fn test_init_keeps_existing_config() {
    let env = TestEnv::new().expect("Failed to create test environment");
    env.write_config(r#"{"agent": {"defaults": {"model": "custom/model"}}}"#)
        .unwrap();

    env.command().arg("init").assert().success();

    let text = fs::read_to_string(env.config_file()).unwrap();
    assert!(text.contains("custom/model"));
}

// ============================================================================
// Status command tests
// ============================================================================

#[test]
fn test_status_without_config() {
    let env = TestEnv::new().expect("Failed to create test environment");

    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("taskloom Status"))
        .stdout(predicate::str::contains("[Missing]"))
        .stdout(predicate::str::contains("Checklist: none"));
}

#[test]
fn test_status_after_init() {
    let env = TestEnv::new().expect("Failed to create test environment");
    env.command().arg("init").assert().success();

    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK]"))
        .stdout(predicate::str::contains("API Key:   [Missing]"))
        .stdout(predicate::str::contains("Rounds:    30 per task"));
}

#[test]
fn test_status_reports_checklist_progress() {
    let env = TestEnv::new().expect("Failed to create test environment");
    env.write_checklist("## 1. Setup\n- [x] 1.1 Create config file\n- [ ] 1.2 Fill config file\n")
        .unwrap();

    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Checklist: 1/2 done"))
        .stdout(predicate::str::contains("Next:      1.2 Fill config file"));
}

#[test]
fn test_status_with_api_key_from_env() {
    let env = TestEnv::new().expect("Failed to create test environment");

    env.command()
        .arg("status")
        .env("TASKLOOM_API_KEY", "sk-test")
        .assert()
        .success()
        .stdout(predicate::str::contains("API Key:   [Set]"));
}

#[test]
fn test_invalid_config_fails() {
    let env = TestEnv::new().expect("Failed to create test environment");
    env.write_config("{ not json").unwrap();

    env.command()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

// ============================================================================
// Tools command tests
// ============================================================================

#[test]
fn test_tools_lists_builtins() {
    let env = TestEnv::new().expect("Failed to create test environment");

    env.command()
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tools (6)"))
        .stdout(predicate::str::contains("- create_file:"))
        .stdout(predicate::str::contains("- execute_command:"));
}

// ============================================================================
// Run / resume without credentials
// ============================================================================

#[test]
fn test_run_without_api_key_fails() {
    let env = TestEnv::new().expect("Failed to create test environment");

    env.command()
        .args(["run", "-m", "Create a config file"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_resume_without_api_key_fails() {
    let env = TestEnv::new().expect("Failed to create test environment");

    env.command()
        .arg("resume")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}
