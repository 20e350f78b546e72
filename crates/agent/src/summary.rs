//! Operation-log digests and the end-of-run summary

use tracing::{info, warn};

use taskloom_provider::ChatResponse;
use taskloom_store::{is_task_id, OperationLog, OperationLogStore, Role, StateLayout};

use crate::agent::Agent;
use crate::contracts::{OperationReply, SummaryReply};
use crate::context::RunContext;
use crate::prompts;
use crate::Result;

/// Markdown digest of one task's log: what each reply did and what tools returned
pub fn format_log(log: &OperationLog) -> String {
    let mut out = format!("## Task {}\n", log.task_id());

    for record in log.records() {
        match record.role {
            Role::Assistant => {
                let response = ChatResponse::text(record.content.clone());
                match OperationReply::from_response(&response) {
                    Some(reply) => {
                        if !reply.todo_item.is_empty() {
                            out.push_str(&format!("- Item: {}\n", reply.todo_item));
                        }
                        if !reply.step_summary.is_empty() {
                            out.push_str(&format!("  - Step: {}\n", reply.step_summary));
                        }
                        out.push_str(&format!("  - Action: {}\n", reply.action_type()));
                        if !reply.explanation.is_empty() {
                            out.push_str(&format!("  - Explanation: {}\n", reply.explanation));
                        }
                        out.push_str(&format!("  - Success: {}\n", reply.success));
                    }
                    None => out.push_str(&format!("- Reply: {}\n", record.content.trim())),
                }
            }
            Role::ToolResult => {
                out.push_str(&format!("  - Tool result: {}\n", record.content.trim()));
            }
            Role::System | Role::User | Role::HistoryResult => {}
        }
    }

    out
}

/// Digest of the logs of `task_ids`, in the order given
pub async fn history_digest(store: &OperationLogStore, task_ids: &[String]) -> String {
    if task_ids.is_empty() {
        return "No task ids requested.".to_string();
    }

    let mut parts = Vec::with_capacity(task_ids.len());
    for id in task_ids {
        if !is_task_id(id) {
            warn!(task_id = %id, "Ignoring malformed history id");
            parts.push(format!("## Task {}\nNot a task id.\n", id));
            continue;
        }
        let log = store.load(id).await;
        if log.is_empty() {
            parts.push(format!("## Task {}\nNo operation history.\n", id));
        } else {
            parts.push(format_log(&log));
        }
    }
    parts.join("\n")
}

/// Writes `summary.md` from every operation log of the run
pub struct Summarizer {
    agent: Agent,
    layout: StateLayout,
}

impl Summarizer {
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            agent: ctx.agent("summary", prompts::SUMMARY_SYSTEM),
            layout: ctx.layout().clone(),
        }
    }

    pub async fn summarize(&self) -> Result<String> {
        let logs = self.layout.operation_logs().load_all().await;
        let history = logs.iter().map(format_log).collect::<Vec<_>>().join("\n");

        let SummaryReply(summary) = self
            .agent
            .ask::<SummaryReply>(&prompts::summary_request(&history))
            .await?;

        match tokio::fs::write(self.layout.summary_path(), &summary).await {
            Ok(()) => info!("Wrote summary to {:?}", self.layout.summary_path()),
            Err(e) => warn!("Failed to write summary: {}", e),
        }
        Ok(summary)
    }
}
