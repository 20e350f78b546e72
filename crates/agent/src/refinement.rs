//! Refinement of the next open checklist item

use tracing::info;

use taskloom_store::checklist::task_id_from;
use taskloom_store::RefinementDoc;

use crate::agent::Agent;
use crate::context::RunContext;
use crate::contracts::RefinementReply;
use crate::prompts;
use crate::{AgentError, Result};

pub struct RefinementGenerator {
    agent: Agent,
}

impl RefinementGenerator {
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            agent: ctx.agent(
                "refinement",
                prompts::refinement_system(&ctx.tools().summary_lines()),
            ),
        }
    }

    /// Ask the model to expand the first unchecked item of `plan_text`
    pub async fn refine(&self, plan_text: &str) -> Result<RefinementDoc> {
        let reply: RefinementReply = self
            .agent
            .ask(&prompts::refinement_request(plan_text))
            .await?;

        let task_id = task_id_from(&reply.current_task)
            .ok_or_else(|| AgentError::TaskIdentification(reply.current_task.clone()))?;

        info!(
            task_id = %task_id,
            steps = reply.steps.len(),
            "Refined task"
        );

        Ok(RefinementDoc {
            task_id,
            current_task: reply.current_task,
            description: reply.task_description,
            steps: reply.steps,
        })
    }
}
