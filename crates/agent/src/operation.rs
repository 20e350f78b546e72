//! Per-task operation loop
//!
//! Each round asks the operator model for one action. Tool and history actions
//! get a second exchange that feeds the result back; the reply to that exchange
//! decides completion for tool rounds, while history rounds never complete. Every
//! record is persisted as soon as it exists, so a restart replays the exact
//! prefix of the conversation.

use tracing::{debug, info, warn};

use taskloom_provider::{ChatResponse, Message};
use taskloom_store::{OperationLog, OperationLogStore, Role};

use crate::agent::{to_messages, Agent};
use crate::context::RunContext;
use crate::contracts::{OperationAction, OperationReply};
use crate::{prompts, summary, AgentError, Result};

/// Roles replayed on an ordinary round
const REPLAYED: &[Role] = &[Role::Assistant, Role::ToolResult];
/// Roles replayed when feeding back a history pull
const REPLAYED_WITH_HISTORY: &[Role] = &[Role::Assistant, Role::ToolResult, Role::HistoryResult];

/// How a loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    Succeeded {
        rounds: u32,
        exchanges: u32,
        explanation: String,
    },
    Exhausted {
        rounds: u32,
        exchanges: u32,
    },
}

impl LoopOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoopOutcome::Succeeded { .. })
    }

    pub fn exchanges(&self) -> u32 {
        match self {
            LoopOutcome::Succeeded { exchanges, .. } | LoopOutcome::Exhausted { exchanges, .. } => {
                *exchanges
            }
        }
    }
}

pub struct OperationLoop<'a> {
    ctx: &'a RunContext,
    agent: Agent,
    logs: OperationLogStore,
}

impl<'a> OperationLoop<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self {
            agent: ctx.agent(
                "operate",
                prompts::operate_system(&ctx.tools().catalog_json(), ctx.workspace()),
            ),
            logs: ctx.layout().operation_logs(),
            ctx,
        }
    }

    /// Drive task `task_id` until the model reports it done or the round cap hits
    pub async fn run(&self, task_id: &str, refinement: &str) -> Result<LoopOutcome> {
        let mut log = self.logs.load(task_id).await;
        if log.ensure_system(self.agent.system_prompt()) {
            self.persist(&log).await;
        } else {
            info!(task_id, records = log.len(), "Resuming operation log");
        }

        let max_rounds = self.ctx.max_rounds();
        let mut exchanges = 0;

        for round in 1..=max_rounds {
            if self.ctx.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            debug!(task_id, round, "Operation round");

            let checklist = self.ctx.layout().checklist().load_text().await;
            let prompt = prompts::operate_first_step(refinement, &checklist, self.ctx.workspace());
            let (raw, response) = self.exchange(&mut log, REPLAYED, prompt).await?;
            exchanges += 1;

            let Some(reply) = OperationReply::from_response(&response) else {
                warn!(task_id, round, "Reply carries no action, retrying the round");
                continue;
            };

            match reply.action {
                OperationAction::Tool { name, params } => {
                    let result = self.ctx.tools().invoke(&name, params).await;
                    let result_json = result.to_json_string();
                    log.append(Role::ToolResult, result_json.clone())?;
                    self.persist(&log).await;

                    let checklist = self.ctx.layout().checklist().load_text().await;
                    let feedback = prompts::operate_tool_step(
                        &raw,
                        &result_json,
                        refinement,
                        &checklist,
                        self.ctx.workspace(),
                    );
                    let (_, response) = self.exchange(&mut log, REPLAYED, feedback).await?;
                    exchanges += 1;

                    let (success, explanation) = match OperationReply::from_response(&response) {
                        Some(reply) => (reply.success, reply.explanation),
                        None => {
                            warn!(task_id, round, "Tool feedback reply unparseable, assuming success");
                            (true, String::new())
                        }
                    };

                    if success {
                        info!(task_id, rounds = round, exchanges, "Task succeeded");
                        return Ok(LoopOutcome::Succeeded {
                            rounds: round,
                            exchanges,
                            explanation,
                        });
                    }
                }
                OperationAction::History { task_ids } => {
                    let digest = summary::history_digest(&self.logs, &task_ids).await;
                    log.append(Role::HistoryResult, digest.clone())?;
                    self.persist(&log).await;

                    let checklist = self.ctx.layout().checklist().load_text().await;
                    let feedback = prompts::operate_history_step(
                        &raw,
                        &digest,
                        refinement,
                        &checklist,
                        self.ctx.workspace(),
                    );
                    self.exchange(&mut log, REPLAYED_WITH_HISTORY, feedback)
                        .await?;
                    exchanges += 1;
                }
                OperationAction::None => {
                    if reply.success {
                        info!(task_id, rounds = round, exchanges, "Task succeeded");
                        return Ok(LoopOutcome::Succeeded {
                            rounds: round,
                            exchanges,
                            explanation: reply.explanation,
                        });
                    }
                }
            }
        }

        warn!(task_id, max_rounds, exchanges, "Round budget exhausted");
        Ok(LoopOutcome::Exhausted {
            rounds: max_rounds,
            exchanges,
        })
    }

    /// Replay the log, send `prompt`, persist prompt and reply
    async fn exchange(
        &self,
        log: &mut OperationLog,
        replayed: &[Role],
        prompt: String,
    ) -> Result<(String, ChatResponse)> {
        let mut messages = to_messages(log.replay(replayed));
        messages.push(Message::user(prompt.clone()));

        log.append(Role::User, prompt)?;
        let response = self.agent.send(messages).await?;

        let raw = raw_reply(&response);
        log.append(Role::Assistant, raw.clone())?;
        self.persist(log).await;

        Ok((raw, response))
    }

    /// A failed write leaves the in-memory log authoritative for this run
    async fn persist(&self, log: &OperationLog) {
        if let Err(e) = self.logs.save(log).await {
            warn!(task_id = log.task_id(), "Failed to save operation log: {}", e);
        }
    }
}

/// Text persisted for a reply; native tool calls are kept as JSON
fn raw_reply(response: &ChatResponse) -> String {
    let text = response.text_content();
    if !text.trim().is_empty() || !response.has_tool_calls() {
        return text.to_string();
    }
    serde_json::to_string(&response.tool_calls).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskloom_provider::ToolCall;

    #[test]
    fn test_raw_reply_prefers_text() {
        assert_eq!(raw_reply(&ChatResponse::text("{\"a\":1}")), "{\"a\":1}");
    }

    #[test]
    fn test_raw_reply_serializes_tool_calls() {
        let response = ChatResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "c1".to_string(),
                name: "read_file".to_string(),
                arguments: json!({"path": "a"}),
            }],
            finish_reason: "tool_calls".to_string(),
            usage: Default::default(),
        };
        let raw = raw_reply(&response);
        assert!(raw.contains("\"name\":\"read_file\""));
    }

    #[test]
    fn test_outcome_accessors() {
        let done = LoopOutcome::Succeeded {
            rounds: 1,
            exchanges: 2,
            explanation: String::new(),
        };
        assert!(done.is_success());
        assert_eq!(done.exchanges(), 2);
        assert!(!LoopOutcome::Exhausted { rounds: 3, exchanges: 3 }.is_success());
    }
}
