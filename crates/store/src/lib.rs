//! File-addressed orchestrator state
//!
//! Everything the orchestrator needs to resume lives under one state directory:
//! the checklist document, one refinement document per task, and one operation
//! log per task. The layout assumes a single writer; there is no locking.

use thiserror::Error;

pub mod checklist;
pub mod layout;
pub mod operation_log;
pub mod refinement;

pub use checklist::{is_task_id, ChecklistStore, Plan, PlanItem, PlanSection};
pub use layout::StateLayout;
pub use operation_log::{OperationLog, OperationLogStore, OperationRecord, Role};
pub use refinement::{RefinementDoc, RefinementStep, RefinementStore};

/// State persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("state I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate checklist id: {0}")]
    DuplicateId(String),

    #[error("a system record may only open an operation log")]
    SystemRecordMisplaced,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// File stem for a dotted task id (`1.2` -> `1_2`)
pub fn task_file_stem(task_id: &str) -> String {
    task_id.replace('.', "_")
}

/// Inverse of [`task_file_stem`]
pub fn task_id_from_stem(stem: &str) -> String {
    stem.replace('_', ".")
}

/// Sort key that orders `1.2` before `1.10`
pub fn task_sort_key(task_id: &str) -> Vec<u64> {
    task_id
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(u64::MAX))
        .collect()
}
