//! Common test utilities for taskloom CLI tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated HOME with its own `~/.taskloom`
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let data_dir = temp_dir.path().join(".taskloom");

        Ok(Self { temp_dir, data_dir })
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.data_dir.join("workspace")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    /// Command bound to this environment, with no API key in scope
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_taskloom"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env_remove("TASKLOOM_API_KEY");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Write a config with the given JSON body
    pub fn write_config(&self, body: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(self.config_file(), body)?;
        Ok(())
    }

    /// Write a checklist into the default state directory
    pub fn write_checklist(&self, text: &str) -> anyhow::Result<()> {
        let todo = self.state_dir().join("todo");
        std::fs::create_dir_all(&todo)?;
        std::fs::write(todo.join("planning.md"), text)?;
        Ok(())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
