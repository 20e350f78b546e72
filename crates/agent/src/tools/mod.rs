//! Tool registry and dispatcher
//!
//! Tools never fail the caller: [`ToolRegistry::invoke`] turns errors, panics and
//! unknown names into a [`ToolResult::Error`] the model can read.

pub mod filesystem;
pub mod path_utils;
pub mod shell;

pub use filesystem::{
    CreateFileTool, DeleteFileTool, ListDirectoryTool, ReadFileTool, WriteFileTool,
};
pub use shell::ExecuteCommandTool;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors a tool reports back to the dispatcher
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("{message}")]
    Failed {
        message: String,
        error_type: Option<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path {path} is outside workspace {workspace}")]
    OutsideWorkspace { path: String, workspace: String },
}

impl ToolError {
    pub fn failed(message: impl Into<String>, error_type: &str) -> Self {
        ToolError::Failed {
            message: message.into(),
            error_type: Some(error_type.to_string()),
        }
    }

    /// Machine-readable category
    pub fn error_type(&self) -> Option<String> {
        match self {
            ToolError::InvalidParams(_) => Some("invalid_params".to_string()),
            ToolError::Failed { error_type, .. } => error_type.clone(),
            ToolError::Io(_) => Some("io".to_string()),
            ToolError::OutsideWorkspace { .. } => Some("outside_workspace".to_string()),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::InvalidParams(e.to_string())
    }
}

/// Outcome of one invocation, as fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        payload: Value,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_type: Option<String>,
    },
}

impl ToolResult {
    pub fn success(payload: Value) -> Self {
        ToolResult::Success { payload }
    }

    pub fn error(message: impl Into<String>, error_type: Option<&str>) -> Self {
        ToolResult::Error {
            message: message.into(),
            error_type: error_type.map(str::to_string),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    pub fn error_type(&self) -> Option<&str> {
        match self {
            ToolResult::Error { error_type, .. } => error_type.as_deref(),
            ToolResult::Success { .. } => None,
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            json!({ "status": "error", "message": format!("unserializable tool result: {}", e) })
                .to_string()
        })
    }
}

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Name -> tool map
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with every built-in tool confined to `workspace`
    pub fn with_defaults(workspace: &Path, exec_timeout: Duration) -> Self {
        let mut registry = Self::new();
        register_default_tools(&mut registry, workspace, exec_timeout);
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Box::new(tool)).is_some() {
            warn!("Replaced tool {}", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `{name, description, parameters}` for every tool, sorted by name
    pub fn catalog(&self) -> Vec<Value> {
        self.names()
            .iter()
            .filter_map(|name| self.get(name))
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters(),
                })
            })
            .collect()
    }

    /// Pretty JSON catalog for prompts
    pub fn catalog_json(&self) -> String {
        serde_json::to_string_pretty(&self.catalog()).unwrap_or_else(|_| "[]".to_string())
    }

    /// `- name: description` lines
    pub fn summary_lines(&self) -> String {
        self.names()
            .iter()
            .filter_map(|name| self.get(name))
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run a tool by name. Never returns an error or unwinds.
    pub async fn invoke(&self, name: &str, params: Value) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            warn!("Tool not found: {}", name);
            return ToolResult::error(format!("tool not found: {}", name), Some("tool_not_found"));
        };

        debug!(tool = name, params = %params, "Invoking tool");
        let started = Instant::now();
        let outcome = AssertUnwindSafe(tool.execute(params)).catch_unwind().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(payload)) => {
                info!(tool = name, elapsed_ms, "Tool succeeded");
                ToolResult::success(payload)
            }
            Ok(Err(e)) => {
                warn!(tool = name, elapsed_ms, error = %e, "Tool failed");
                ToolResult::Error {
                    message: e.to_string(),
                    error_type: e.error_type(),
                }
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool = name, elapsed_ms, panic = %message, "Tool panicked");
                ToolResult::error(format!("tool {} panicked: {}", name, message), Some("panic"))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Register the built-in tools with the given workspace
pub fn register_default_tools(registry: &mut ToolRegistry, workspace: &Path, exec_timeout: Duration) {
    let workspace = workspace.to_path_buf();

    registry.register(CreateFileTool::new(workspace.clone()));
    registry.register(WriteFileTool::new(workspace.clone()));
    registry.register(ReadFileTool::new(workspace.clone()));
    registry.register(DeleteFileTool::new(workspace.clone()));
    registry.register(ListDirectoryTool::new(workspace.clone()));

    registry.register(ExecuteCommandTool::new(exec_timeout, workspace));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickyTool;

    #[async_trait]
    impl ToolTrait for PanickyTool {
        fn name(&self) -> &str {
            "panicky"
        }
        fn description(&self) -> &str {
            "Always panics"
        }
        fn parameters(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
            panic!("kaboom")
        }
    }

    #[test]
    fn test_tool_result_wire_format() {
        let ok = ToolResult::success(json!({"bytes": 3}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "success", "payload": {"bytes": 3}})
        );

        let err = ToolResult::error("nope", Some("file_exists"));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "error", "message": "nope", "error_type": "file_exists"})
        );

        let bare = ToolResult::error("nope", None);
        assert_eq!(
            bare.to_json_string(),
            r#"{"status":"error","message":"nope"}"#
        );
    }

    #[test]
    fn test_tool_error_types() {
        assert_eq!(
            ToolError::InvalidParams("x".into()).error_type().as_deref(),
            Some("invalid_params")
        );
        assert_eq!(
            ToolError::failed("exists", "file_exists").error_type().as_deref(),
            Some("file_exists")
        );
        let err: ToolError = serde_json::from_str::<Value>("{").unwrap_err().into();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_invoke_catches_panic() {
        let mut registry = ToolRegistry::new();
        registry.register(PanickyTool);

        let result = registry.invoke("panicky", json!({})).await;
        assert_eq!(result.error_type(), Some("panic"));
        match result {
            ToolResult::Error { message, .. } => assert!(message.contains("kaboom")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("teleport", json!({})).await;
        assert_eq!(
            result,
            ToolResult::error("tool not found: teleport", Some("tool_not_found"))
        );
    }

    #[test]
    fn test_defaults_registered() {
        let registry = ToolRegistry::with_defaults(Path::new("/tmp"), Duration::from_secs(5));
        assert_eq!(
            registry.names(),
            vec![
                "create_file",
                "delete_file",
                "execute_command",
                "list_directory",
                "read_file",
                "write_file"
            ]
        );
        assert_eq!(registry.catalog().len(), 6);
        assert!(registry.summary_lines().contains("- read_file: "));
    }
}
