//! Well-known locations under `~/.taskloom`

use std::path::{Path, PathBuf};

/// Root data directory (~/.taskloom)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".taskloom")
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Default workspace that tools operate in
pub fn workspace_path() -> PathBuf {
    data_dir().join("workspace")
}

/// Default state directory (checklist, refinements, operation logs)
pub fn state_path() -> PathBuf {
    data_dir().join("state")
}

/// Expand a leading `~` against the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Ensure directory exists
pub async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}
