//! Top-level request workflow
//!
//! `analysis -> planning -> (refine -> operate)* -> summary`. Every stage reads
//! and writes the state directory, so a run that stops half way can be picked up
//! again with [`WorkflowController::resume`].

use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use taskloom_store::checklist::mark_complete;
use taskloom_store::{Plan, RefinementDoc};

use crate::context::RunContext;
use crate::contracts::{AnalysisReply, PlanningReply};
use crate::operation::{LoopOutcome, OperationLoop};
use crate::refinement::RefinementGenerator;
use crate::summary::Summarizer;
use crate::{prompts, AgentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Success,
    Error,
    Exit,
}

/// Outcome of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub status: WorkflowStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
}

impl WorkflowResult {
    pub fn exit() -> Self {
        Self {
            status: WorkflowStatus::Exit,
            message: "bye".to_string(),
            summary: None,
            analysis: None,
            completed_tasks: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>, completed_tasks: Vec<String>) -> Self {
        Self {
            status: WorkflowStatus::Error,
            message: message.into(),
            summary: None,
            analysis: None,
            completed_tasks,
        }
    }

    fn answered(analysis: AnalysisReply) -> Self {
        Self {
            status: WorkflowStatus::Success,
            message: analysis.message.clone(),
            summary: None,
            analysis: Some(analysis.message),
            completed_tasks: Vec::new(),
        }
    }

    fn finished(completed_tasks: Vec<String>, summary: Option<String>) -> Self {
        Self {
            status: WorkflowStatus::Success,
            message: format!("all tasks completed ({})", completed_tasks.len()),
            summary,
            analysis: None,
            completed_tasks,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == WorkflowStatus::Success
    }
}

/// Input that ends an interactive session
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

pub struct WorkflowController {
    ctx: RunContext,
}

impl WorkflowController {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Run a fresh request from scratch; state from earlier runs is discarded
    pub async fn execute(&self, user_input: &str) -> WorkflowResult {
        if is_exit_command(user_input) {
            return WorkflowResult::exit();
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);
        let mut completed = Vec::new();

        let outcome = async {
            info!("Starting run");
            self.ctx.layout().reset().await?;

            let analysis = self.analyze(user_input).await?;
            if !analysis.need_planning {
                info!("No planning needed, answering directly");
                return Ok(Some(WorkflowResult::answered(analysis)));
            }

            self.plan(user_input).await?;
            self.run_tasks(&mut completed).await?;
            Ok::<_, AgentError>(None)
        }
        .instrument(span.clone())
        .await;

        self.conclude(outcome, completed).instrument(span).await
    }

    /// Continue the checklist left on disk by an interrupted run
    pub async fn resume(&self) -> WorkflowResult {
        let span = info_span!("resume", run_id = %Uuid::new_v4());
        let checklist = self.ctx.layout().checklist();
        if !checklist.exists() {
            return WorkflowResult::error(
                format!("no checklist to resume at {:?}", checklist.path()),
                Vec::new(),
            );
        }

        let mut completed = Vec::new();
        let outcome = async {
            info!("Resuming run");
            self.ctx.layout().ensure().await?;
            self.run_tasks(&mut completed).await?;
            Ok::<_, AgentError>(None)
        }
        .instrument(span.clone())
        .await;

        self.conclude(outcome, completed).instrument(span).await
    }

    async fn conclude(
        &self,
        outcome: Result<Option<WorkflowResult>>,
        completed: Vec<String>,
    ) -> WorkflowResult {
        match outcome {
            Ok(Some(answer)) => answer,
            Ok(None) => {
                let summary = match Summarizer::new(&self.ctx).summarize().await {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        warn!("Summary failed: {}", e);
                        None
                    }
                };
                info!(completed = completed.len(), "Run finished");
                WorkflowResult::finished(completed, summary)
            }
            Err(e) => {
                error!(completed = completed.len(), "Run failed: {}", e);
                WorkflowResult::error(e.to_string(), completed)
            }
        }
    }

    async fn analyze(&self, user_input: &str) -> Result<AnalysisReply> {
        let agent = self.ctx.agent("analysis", prompts::ANALYSIS_SYSTEM);
        let reply: AnalysisReply = agent.ask(user_input).await?;
        info!(
            need_planning = reply.need_planning,
            complexity = reply.complexity.as_deref().unwrap_or("unknown"),
            "Analysis done"
        );
        Ok(reply)
    }

    /// Produce and persist the checklist
    async fn plan(&self, user_input: &str) -> Result<()> {
        let agent = self.ctx.agent(
            "planning",
            prompts::planning_system(&self.ctx.tools().catalog_json()),
        );
        let reply: PlanningReply = agent.ask(&prompts::planning_request(user_input)).await?;

        let text = match reply.task_structure {
            Some(structure) if has_items(&structure) => structure,
            _ => {
                warn!("Planning produced no usable checklist, using a single-item plan");
                prompts::default_plan(user_input)
            }
        };

        self.ctx.layout().checklist().save(&text).await?;
        info!(
            task_name = reply.task_name.as_deref().unwrap_or(""),
            "Checklist saved"
        );
        Ok(())
    }

    /// Work through every open checklist item in document order
    async fn run_tasks(&self, completed: &mut Vec<String>) -> Result<()> {
        let checklist = self.ctx.layout().checklist();
        let refinements = self.ctx.layout().refinements();
        let generator = RefinementGenerator::new(&self.ctx);
        let operator = OperationLoop::new(&self.ctx);

        loop {
            if self.ctx.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let plan_text = overlay_completed(checklist.load_text().await, completed.as_slice());
            let plan = Plan::parse(&plan_text)?;
            let Some(next) = plan.next_unchecked() else {
                info!("Checklist complete");
                return Ok(());
            };

            let (task_id, refinement) = match refinements.load(&next.id).await {
                Some(text) => {
                    info!(task_id = %next.id, "Reusing refinement");
                    (next.id.clone(), text)
                }
                None => {
                    let doc = generator.refine(&plan_text).await?;
                    ensure_open_item(&plan, &doc)?;
                    if let Err(e) = refinements.save(&doc).await {
                        warn!(task_id = %doc.task_id, "Failed to save refinement: {}", e);
                    }
                    (doc.task_id.clone(), doc.render())
                }
            };

            match operator.run(&task_id, &refinement).await? {
                LoopOutcome::Succeeded {
                    rounds, exchanges, ..
                } => {
                    match checklist.mark_complete(&task_id).await {
                        Ok(true) => {}
                        Ok(false) => {
                            return Err(AgentError::TaskIdentification(format!(
                                "{} could not be marked complete",
                                task_id
                            )));
                        }
                        Err(e) => {
                            warn!(task_id = %task_id, "Failed to update checklist: {}", e);
                        }
                    }
                    info!(task_id = %task_id, rounds, exchanges, "Task completed");
                    completed.push(task_id);
                }
                LoopOutcome::Exhausted { rounds, .. } => {
                    return Err(AgentError::RoundsExhausted { task_id, rounds });
                }
            }
        }
    }
}

/// Ticks items finished in this run, in case their checklist write was lost
fn overlay_completed(text: String, completed: &[String]) -> String {
    completed
        .iter()
        .fold(text, |text, id| mark_complete(&text, id))
}

fn has_items(text: &str) -> bool {
    Plan::parse(text)
        .map(|plan| plan.items().next().is_some())
        .unwrap_or(false)
}

/// The refined id must name an item that is still open
fn ensure_open_item(plan: &Plan, doc: &RefinementDoc) -> Result<()> {
    match plan.find(&doc.task_id) {
        Some(item) if !item.done => Ok(()),
        Some(_) => Err(AgentError::TaskIdentification(format!(
            "{} is already complete",
            doc.task_id
        ))),
        None => Err(AgentError::TaskIdentification(format!(
            "{} is not in the checklist",
            doc.task_id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> RefinementDoc {
        RefinementDoc {
            task_id: id.to_string(),
            current_task: format!("{} something", id),
            description: String::new(),
            steps: Vec::new(),
        }
    }

    #[test]
    fn test_exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("  QUIT \n"));
        assert!(!is_exit_command("exit now"));
    }

    #[test]
    fn test_ensure_open_item() {
        let plan = Plan::parse("## 1. A\n- [x] 1.1 done\n- [ ] 1.2 open\n").unwrap();
        assert!(ensure_open_item(&plan, &doc("1.2")).is_ok());
        assert!(matches!(
            ensure_open_item(&plan, &doc("1.1")),
            Err(AgentError::TaskIdentification(_))
        ));
        assert!(matches!(
            ensure_open_item(&plan, &doc("3.1")),
            Err(AgentError::TaskIdentification(_))
        ));
    }

    #[test]
    fn test_has_items() {
        assert!(has_items("## 1. Setup\n- [ ] 1.1 Create config file\n"));
        assert!(!has_items("## 1. Setup\nno items here\n"));
        assert!(!has_items("## 1. A\n- [ ] 1.1 a\n- [ ] 1.1 b\n"));
    }

    #[test]
    fn test_overlay_completed_ticks_run_items() {
        let text = "## 1. A\n- [ ] 1.1 a\n- [ ] 1.10 b\n".to_string();
        let text = overlay_completed(text, &["1.1".to_string()]);
        assert_eq!(text, "## 1. A\n- [x] 1.1 a\n- [ ] 1.10 b\n");
        assert_eq!(overlay_completed(text.clone(), &[]), text);
    }

    #[test]
    fn test_result_serializes_lowercase_status() {
        let json = serde_json::to_value(WorkflowResult::exit()).unwrap();
        assert_eq!(json["status"], "exit");
        assert!(json.get("summary").is_none());
    }
}
