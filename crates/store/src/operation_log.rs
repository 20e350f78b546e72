//! Per-task operation logs
//!
//! A log is the replayable conversation of one checklist item: a single leading
//! `system` record followed by the records of every round, in round order. Logs
//! are persisted after every append so a restarted run picks up the exact prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{task_file_stem, task_id_from_stem, task_sort_key, Result, StoreError};

/// Closed set of record roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    ToolResult,
    HistoryResult,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolResult => "tool_result",
            Role::HistoryResult => "history_result",
        }
    }

    /// Exact (case-insensitive) match against the closed set
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "tool_result" => Some(Role::ToolResult),
            "history_result" => Some(Role::HistoryResult),
            _ => None,
        }
    }

    /// Total mapping; anything outside the closed set becomes `user`, which is
    /// never replayed and can't add a second system record
    pub fn normalize(raw: &str) -> Role {
        Role::parse(raw).unwrap_or(Role::User)
    }

    /// Role understood by a chat endpoint
    pub fn wire_role(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System | Role::ToolResult | Role::HistoryResult => "system",
        }
    }

}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct RawRecord {
    role: String,
    #[serde(default)]
    content: String,
}

/// One `{role, content}` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct OperationRecord {
    pub role: Role,
    pub content: String,
}

impl From<RawRecord> for OperationRecord {
    // Hand-edited logs may carry foreign roles; the original name stays visible
    // in the content
    fn from(raw: RawRecord) -> Self {
        let role = Role::normalize(&raw.role);
        let content = if Role::parse(&raw.role).is_some() {
            raw.content
        } else {
            format!("{}: {}", raw.role.trim(), raw.content)
        };
        OperationRecord { role, content }
    }
}

impl OperationRecord {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// `(role, content)` as sent to a chat endpoint.
    ///
    /// Roles the endpoint doesn't know go out as `system` with the role name
    /// prefixed, so the model still sees where the content came from.
    pub fn wire(&self) -> (&'static str, String) {
        match self.role {
            Role::System | Role::User | Role::Assistant => {
                (self.role.wire_role(), self.content.clone())
            }
            Role::ToolResult | Role::HistoryResult => (
                self.role.wire_role(),
                format!("{}: {}", self.role.as_str(), self.content),
            ),
        }
    }
}

/// Append-only record list of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationLog {
    task_id: String,
    records: Vec<OperationRecord>,
}

impl OperationLog {
    /// Fresh log opened by `system_prompt`
    pub fn new(task_id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            records: vec![OperationRecord::new(Role::System, system_prompt)],
        }
    }

    pub fn empty(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            records: Vec::new(),
        }
    }

    /// Rebuild from persisted records, keeping only a leading system record
    pub fn from_records(task_id: impl Into<String>, records: Vec<OperationRecord>) -> Self {
        let task_id = task_id.into();
        let mut kept = Vec::with_capacity(records.len());

        for (idx, record) in records.into_iter().enumerate() {
            if record.role == Role::System && idx > 0 {
                warn!("Dropping misplaced system record at {} in log {}", idx, task_id);
                continue;
            }
            kept.push(record);
        }

        Self {
            task_id,
            records: kept,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.records
            .first()
            .filter(|r| r.role == Role::System)
            .map(|r| r.content.as_str())
    }

    /// Open the log with `prompt` unless it already has a system record
    pub fn ensure_system(&mut self, prompt: impl Into<String>) -> bool {
        if self.system_prompt().is_some() {
            return false;
        }
        self.records
            .insert(0, OperationRecord::new(Role::System, prompt));
        true
    }

    /// Append a non-system record
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Result<()> {
        if role == Role::System {
            return Err(StoreError::SystemRecordMisplaced);
        }
        self.records.push(OperationRecord::new(role, content));
        Ok(())
    }

    /// The system record followed by every record whose role is in `roles`
    pub fn replay<'a>(&'a self, roles: &'a [Role]) -> impl Iterator<Item = &'a OperationRecord> {
        self.records
            .iter()
            .enumerate()
            .filter(move |(idx, r)| (*idx == 0 && r.role == Role::System) || roles.contains(&r.role))
            .map(|(_, r)| r)
    }

    pub fn last_of(&self, role: Role) -> Option<&OperationRecord> {
        self.records.iter().rev().find(|r| r.role == role)
    }
}

/// Directory of `N_M.json` operation logs
#[derive(Debug, Clone)]
pub struct OperationLogStore {
    dir: PathBuf,
}

impl OperationLogStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", task_file_stem(task_id)))
    }

    /// Load a log; missing or unreadable logs come back empty
    pub async fn load(&self, task_id: &str) -> OperationLog {
        let path = self.path_for(task_id);
        if !path.exists() {
            return OperationLog::empty(task_id);
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read operation log {:?}: {}", path, e);
                return OperationLog::empty(task_id);
            }
        };

        if content.trim().is_empty() {
            return OperationLog::empty(task_id);
        }

        match serde_json::from_str::<Vec<OperationRecord>>(&content) {
            Ok(records) => {
                debug!("Loaded {} records for task {}", records.len(), task_id);
                OperationLog::from_records(task_id, records)
            }
            Err(e) => {
                warn!("Failed to parse operation log {:?}: {}", path, e);
                OperationLog::empty(task_id)
            }
        }
    }

    /// Persist the whole log, replacing the previous file atomically
    pub async fn save(&self, log: &OperationLog) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(log.task_id());
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(log.records())?;

        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Saved {} records for task {}", log.len(), log.task_id());
        Ok(())
    }

    /// Task ids with a log on disk, in numeric order
    pub async fn list_task_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(_) => return ids,
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(task_id_from_stem(stem));
            }
        }

        ids.sort_by_key(|id| task_sort_key(id));
        ids
    }

    pub async fn load_all(&self) -> Vec<OperationLog> {
        let mut logs = Vec::new();
        for id in self.list_task_ids().await {
            logs.push(self.load(&id).await);
        }
        logs
    }
}
