//! Shell command tool

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::path_utils::validate_workspace_path;
use super::{ToolError, ToolTrait};

const MAX_OUTPUT: usize = 10_000;

/// Run a command through `sh -c` inside the workspace
pub struct ExecuteCommandTool {
    timeout: Duration,
    workspace: PathBuf,
}

impl ExecuteCommandTool {
    pub fn new(timeout: Duration, workspace: PathBuf) -> Self {
        Self { timeout, workspace }
    }
}

#[derive(Deserialize)]
struct ExecuteCommandArgs {
    command: String,
    working_dir: Option<String>,
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_OUTPUT {
        return text.to_string();
    }
    let mut end = MAX_OUTPUT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n[output truncated: {} bytes omitted]",
        &text[..end],
        text.len() - end
    )
}

#[async_trait]
impl ToolTrait for ExecuteCommandTool {
    fn name(&self) -> &str {
        "execute_command"
    }
    fn description(&self) -> &str {
        "Execute a shell command in the workspace and return its output."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Shell command" },
                "working_dir": { "type": "string", "description": "Directory to run in, relative to the workspace" }
            },
            "required": ["command"]
        })
    }
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ExecuteCommandArgs = serde_json::from_value(args)?;
        if args.command.trim().is_empty() {
            return Err(ToolError::InvalidParams("command is empty".to_string()));
        }

        let working_dir = match &args.working_dir {
            Some(dir) => validate_workspace_path(dir, &self.workspace).await?,
            None => self.workspace.clone(),
        };

        debug!("Executing {:?} in {:?}", args.command, working_dir);
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&args.command)
            .current_dir(&working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::failed(
                    format!("failed to spawn command: {}", e),
                    "spawn_failed",
                ))
            }
            Err(_) => {
                return Err(ToolError::failed(
                    format!("command timed out after {} seconds", self.timeout.as_secs()),
                    "timeout",
                ))
            }
        };

        let stdout = truncate(&String::from_utf8_lossy(&output.stdout));
        let stderr = truncate(&String::from_utf8_lossy(&output.stderr));
        let exit_code = output.status.code().unwrap_or(-1);

        if !output.status.success() {
            return Err(ToolError::failed(
                format!(
                    "command exited with code {}\nstdout:\n{}\nstderr:\n{}",
                    exit_code, stdout, stderr
                ),
                "non_zero_exit",
            ));
        }

        Ok(json!({
            "exit_code": exit_code,
            "stdout": stdout,
            "stderr": stderr,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_output() {
        assert_eq!(truncate("hello"), "hello");
    }

    #[test]
    fn test_truncate_long_output() {
        let long = "x".repeat(MAX_OUTPUT + 5);
        let out = truncate(&long);
        assert!(out.ends_with("[output truncated: 5 bytes omitted]"));
    }
}
