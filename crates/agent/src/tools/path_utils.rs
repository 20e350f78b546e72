//! Workspace confinement for tool paths

use std::path::{Component, Path, PathBuf};

use super::ToolError;

/// Resolve `path` against `workspace_root` and reject anything that escapes it.
///
/// Relative paths are joined to the workspace, `~/` is expanded, `..` segments
/// are folded lexically, and existing prefixes are canonicalized so symlinks
/// pointing outside are caught.
pub async fn validate_workspace_path(
    path: &str,
    workspace_root: &Path,
) -> Result<PathBuf, ToolError> {
    let trimmed = path.trim();
    let expanded = if trimmed.starts_with('/') || trimmed.starts_with('~') {
        expand_tilde(trimmed)
    } else {
        workspace_root.join(trimmed)
    };

    let canonical_workspace = match tokio::fs::canonicalize(workspace_root).await {
        Ok(p) => p,
        Err(_) => normalize(workspace_root),
    };

    let absolute = resolve_existing_prefix(&normalize(&expanded)).await;

    if !is_path_within_workspace(&absolute, &canonical_workspace) {
        return Err(ToolError::OutsideWorkspace {
            path: path.to_string(),
            workspace: canonical_workspace.display().to_string(),
        });
    }

    Ok(absolute)
}

/// Canonicalize the longest existing ancestor and re-attach the rest
async fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();

    loop {
        if let Ok(canonical) = tokio::fs::canonicalize(&existing).await {
            let mut resolved = canonical;
            for part in rest.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }

        match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name);
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Lexically fold `.` and `..`
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_path_within_workspace(path: &Path, workspace: &Path) -> bool {
    path.starts_with(workspace)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_path_within_workspace() {
        let workspace = Path::new("/home/user/.taskloom/workspace");

        assert!(is_path_within_workspace(
            Path::new("/home/user/.taskloom/workspace/file.txt"),
            workspace
        ));
        assert!(is_path_within_workspace(workspace, workspace));
        assert!(!is_path_within_workspace(
            Path::new("/home/user/.taskloom/workspace2/file.txt"),
            workspace
        ));
        assert!(!is_path_within_workspace(Path::new("/etc/passwd"), workspace));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[tokio::test]
    async fn test_relative_path_inside() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = temp_dir.path();
        fs::write(workspace.join("test.txt"), "content").unwrap();

        let result = validate_workspace_path("test.txt", workspace).await.unwrap();
        assert_eq!(result, workspace.join("test.txt").canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_nonexistent_nested_path_inside() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = temp_dir.path();

        let result = validate_workspace_path("new/dir/file.txt", workspace)
            .await
            .unwrap();
        assert!(result.ends_with("new/dir/file.txt"));
        assert!(result.starts_with(workspace.canonicalize().unwrap()));
    }

    #[tokio::test]
    async fn test_traversal_escape_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir(&workspace).unwrap();

        let result = validate_workspace_path("../secret.txt", &workspace).await;
        assert!(matches!(result, Err(ToolError::OutsideWorkspace { .. })));

        let result = validate_workspace_path("missing/../../secret.txt", &workspace).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_absolute_outside_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir(&workspace).unwrap();

        let result = validate_workspace_path("/etc/passwd", &workspace).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("is outside workspace"));
        assert_eq!(err.error_type().as_deref(), Some("outside_workspace"));
    }

    #[tokio::test]
    async fn test_workspace_root_itself() {
        let temp_dir = TempDir::new().unwrap();
        let result = validate_workspace_path(".", temp_dir.path()).await.unwrap();
        assert_eq!(result, temp_dir.path().canonicalize().unwrap());
    }
}
