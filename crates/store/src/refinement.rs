//! Per-task refinement documents

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{task_file_stem, Result};

/// One ordered step of a refined task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementStep {
    pub step_no: u32,
    pub action: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

/// Detailed plan for a single checklist item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementDoc {
    pub task_id: String,
    /// Task label as the model echoed it, e.g. `"1.1 Create config file"`
    pub current_task: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<RefinementStep>,
}

impl RefinementDoc {
    /// Markdown rendering that gets written to disk and shown to the operator model
    pub fn render(&self) -> String {
        let mut out = format!("# {}\n\n", self.current_task.trim());

        if !self.description.trim().is_empty() {
            out.push_str(self.description.trim());
            out.push_str("\n\n");
        }

        for step in &self.steps {
            out.push_str(&format!("## Step {}: {}\n", step.step_no, step.action.trim()));
            if !step.notes.is_empty() {
                out.push_str("- Notes:\n");
                for note in &step.notes {
                    out.push_str(&format!("  - {}\n", note));
                }
            }
            if !step.risks.is_empty() {
                out.push_str("- Risks:\n");
                for risk in &step.risks {
                    out.push_str(&format!("  - {}\n", risk));
                }
            }
            out.push('\n');
        }

        out
    }
}

/// Directory of `N_M.md` refinement documents
#[derive(Debug, Clone)]
pub struct RefinementStore {
    dir: PathBuf,
}

impl RefinementStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{}.md", task_file_stem(task_id)))
    }

    pub fn exists(&self, task_id: &str) -> bool {
        self.path_for(task_id).exists()
    }

    pub async fn save(&self, doc: &RefinementDoc) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&doc.task_id);
        tokio::fs::write(&path, doc.render()).await?;
        debug!("Saved refinement for {} to {:?}", doc.task_id, path);
        Ok(path)
    }

    /// Rendered document for `task_id`, if one was written
    pub async fn load(&self, task_id: &str) -> Option<String> {
        let path = self.path_for(task_id);
        if !path.exists() {
            return None;
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Failed to read refinement {:?}: {}", path, e);
                None
            }
        }
    }
}
