//! On-disk layout of the state directory
//!
//! ```text
//! <state>/todo/planning.md
//! <state>/todo/refinement/N_M.md
//! <state>/operation_history/N_M.json
//! <state>/summary.md
//! ```

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{ChecklistStore, OperationLogStore, RefinementStore, Result};

#[derive(Debug, Clone)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn todo_dir(&self) -> PathBuf {
        self.root.join("todo")
    }

    pub fn checklist_path(&self) -> PathBuf {
        self.todo_dir().join("planning.md")
    }

    pub fn refinement_dir(&self) -> PathBuf {
        self.todo_dir().join("refinement")
    }

    pub fn operation_dir(&self) -> PathBuf {
        self.root.join("operation_history")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join("summary.md")
    }

    pub fn checklist(&self) -> ChecklistStore {
        ChecklistStore::new(self.checklist_path())
    }

    pub fn refinements(&self) -> RefinementStore {
        RefinementStore::new(self.refinement_dir())
    }

    pub fn operation_logs(&self) -> OperationLogStore {
        OperationLogStore::new(self.operation_dir())
    }

    /// Create every directory of the layout
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.refinement_dir()).await?;
        tokio::fs::create_dir_all(self.operation_dir()).await?;
        Ok(())
    }

    /// Drop all state from a previous run and recreate empty directories
    pub async fn reset(&self) -> Result<()> {
        for dir in [self.todo_dir(), self.operation_dir()] {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => debug!("Removed {:?}", dir),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        match tokio::fs::remove_file(self.summary_path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.ensure().await?;
        info!("Reset state at {:?}", self.root);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = StateLayout::new("/tmp/state");
        assert_eq!(
            layout.checklist_path(),
            PathBuf::from("/tmp/state/todo/planning.md")
        );
        assert_eq!(
            layout.refinement_dir(),
            PathBuf::from("/tmp/state/todo/refinement")
        );
        assert_eq!(
            layout.operation_dir(),
            PathBuf::from("/tmp/state/operation_history")
        );
        assert_eq!(layout.summary_path(), PathBuf::from("/tmp/state/summary.md"));
    }

    #[tokio::test]
    async fn test_reset_clears_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StateLayout::new(dir.path());
        layout.ensure().await.unwrap();

        layout.checklist().save("- [ ] 1.1 a\n").await.unwrap();
        tokio::fs::write(layout.summary_path(), "old").await.unwrap();
        tokio::fs::write(layout.operation_dir().join("1_1.json"), "[]")
            .await
            .unwrap();

        layout.reset().await.unwrap();

        assert!(!layout.checklist_path().exists());
        assert!(!layout.summary_path().exists());
        assert!(layout.operation_dir().exists());
        assert!(layout.refinement_dir().exists());
        assert!(layout.operation_logs().list_task_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_on_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StateLayout::new(dir.path().join("fresh"));
        layout.reset().await.unwrap();
        assert!(layout.operation_dir().exists());
    }
}
