//! File system tools

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

use tracing::debug;

use super::path_utils::validate_workspace_path;
use super::{ToolError, ToolTrait};

fn io_failure(e: std::io::Error, path: &str) -> ToolError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => {
            ToolError::failed(format!("permission denied: {}", path), "permission_denied")
        }
        std::io::ErrorKind::NotFound => {
            ToolError::failed(format!("no such file: {}", path), "not_found")
        }
        _ => ToolError::Io(e),
    }
}

/// Create a new file; refuses to clobber unless asked
pub struct CreateFileTool {
    workspace: PathBuf,
}

impl CreateFileTool {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[derive(Deserialize)]
struct CreateFileArgs {
    path: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    overwrite: bool,
}

#[async_trait]
impl ToolTrait for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }
    fn description(&self) -> &str {
        "Create a new file with the given content. Fails if the file exists unless overwrite is true."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path, relative to the workspace" },
                "content": { "type": "string", "description": "Initial content" },
                "overwrite": { "type": "boolean", "description": "Replace an existing file" }
            },
            "required": ["path"]
        })
    }
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: CreateFileArgs = serde_json::from_value(args)?;
        let path = validate_workspace_path(&args.path, &self.workspace).await?;

        if path.exists() && !args.overwrite {
            return Err(ToolError::failed(
                format!("file already exists: {}", args.path),
                "file_exists",
            ));
        }

        debug!("Creating file {:?}", path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &args.content)
            .await
            .map_err(|e| io_failure(e, &args.path))?;

        Ok(json!({
            "path": path.display().to_string(),
            "bytes": args.content.len(),
        }))
    }
}

/// Write or append to a file
pub struct WriteFileTool {
    workspace: PathBuf,
}

impl WriteFileTool {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[derive(Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
    #[serde(default)]
    append: bool,
}

#[async_trait]
impl ToolTrait for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }
    fn description(&self) -> &str {
        "Write content to a file, creating parent directories. Set append to add to the end."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path, relative to the workspace" },
                "content": { "type": "string", "description": "Content to write" },
                "append": { "type": "boolean", "description": "Append instead of replacing" }
            },
            "required": ["path", "content"]
        })
    }
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: WriteFileArgs = serde_json::from_value(args)?;
        let path = validate_workspace_path(&args.path, &self.workspace).await?;

        debug!("Writing file {:?} (append={})", path, args.append);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if args.append {
            use tokio::io::AsyncWriteExt;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|e| io_failure(e, &args.path))?;
            file.write_all(args.content.as_bytes()).await?;
            file.flush().await?;
        } else {
            tokio::fs::write(&path, &args.content)
                .await
                .map_err(|e| io_failure(e, &args.path))?;
        }

        Ok(json!({
            "path": path.display().to_string(),
            "bytes": args.content.len(),
            "append": args.append,
        }))
    }
}

/// Read a text file
pub struct ReadFileTool {
    workspace: PathBuf,
}

impl ReadFileTool {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[async_trait]
impl ToolTrait for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read the content of a text file."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string", "description": "File path, relative to the workspace" } },
            "required": ["path"]
        })
    }
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: PathArgs = serde_json::from_value(args)?;
        let path = validate_workspace_path(&args.path, &self.workspace).await?;

        debug!("Reading file {:?}", path);
        if path.is_dir() {
            return Err(ToolError::failed(
                format!("not a file: {}", args.path),
                "not_a_file",
            ));
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_failure(e, &args.path))?;

        Ok(json!({
            "path": path.display().to_string(),
            "content": content,
        }))
    }
}

/// Delete a single file
pub struct DeleteFileTool {
    workspace: PathBuf,
}

impl DeleteFileTool {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolTrait for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }
    fn description(&self) -> &str {
        "Delete a file."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string", "description": "File path, relative to the workspace" } },
            "required": ["path"]
        })
    }
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: PathArgs = serde_json::from_value(args)?;
        let path = validate_workspace_path(&args.path, &self.workspace).await?;

        if path.is_dir() {
            return Err(ToolError::failed(
                format!("not a file: {}", args.path),
                "not_a_file",
            ));
        }

        debug!("Deleting file {:?}", path);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_failure(e, &args.path))?;

        Ok(json!({
            "path": path.display().to_string(),
            "deleted": true,
        }))
    }
}

/// List a directory
pub struct ListDirectoryTool {
    workspace: PathBuf,
}

impl ListDirectoryTool {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }
}

#[derive(Deserialize)]
struct ListDirectoryArgs {
    #[serde(default = "default_dir")]
    path: String,
}

fn default_dir() -> String {
    ".".to_string()
}

#[async_trait]
impl ToolTrait for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }
    fn description(&self) -> &str {
        "List the entries of a directory. Defaults to the workspace root."
    }
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string", "description": "Directory, relative to the workspace" } }
        })
    }
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ListDirectoryArgs = serde_json::from_value(args)?;
        let path = validate_workspace_path(&args.path, &self.workspace).await?;

        debug!("Listing {:?}", path);
        if !path.is_dir() {
            return Err(ToolError::failed(
                format!("not a directory: {}", args.path),
                "not_a_directory",
            ));
        }

        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| io_failure(e, &args.path))?;
        let mut items = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let kind = if entry.file_type().await?.is_dir() {
                "dir"
            } else {
                "file"
            };
            items.push((entry.file_name().to_string_lossy().to_string(), kind));
        }
        items.sort();

        Ok(json!({
            "path": path.display().to_string(),
            "entries": items
                .into_iter()
                .map(|(name, kind)| json!({ "name": name, "kind": kind }))
                .collect::<Vec<_>>(),
        }))
    }
}
