//! Task execution orchestrator
//!
//! [`WorkflowController`] turns a request into a checklist and works through it
//! item by item: [`RefinementGenerator`] expands the next open item into steps,
//! [`OperationLoop`] drives the model through tool calls until it reports the item
//! done, and every model call goes through [`RetryExecutor`].

use thiserror::Error;

pub mod agent;
pub mod context;
pub mod contracts;
pub mod operation;
pub mod prompts;
pub mod refinement;
pub mod reply;
pub mod retry;
pub mod summary;
pub mod tools;
pub mod workflow;

pub use agent::{Agent, ResponseContract};
pub use context::RunContext;
pub use operation::{LoopOutcome, OperationLoop};
pub use refinement::RefinementGenerator;
pub use retry::{RetryError, RetryExecutor, RetryPolicy};
pub use summary::Summarizer;
pub use tools::{ToolError, ToolRegistry, ToolResult, ToolTrait};
pub use workflow::{WorkflowController, WorkflowResult, WorkflowStatus};

/// Orchestrator errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("model call failed: {0}")]
    Remote(String),

    #[error("model call timed out on every attempt")]
    Timeout,

    #[error("run cancelled")]
    Cancelled,

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("cannot identify task: {0}")]
    TaskIdentification(String),

    #[error("task {task_id} not finished after {rounds} rounds")]
    RoundsExhausted { task_id: String, rounds: u32 },

    #[error(transparent)]
    Store(#[from] taskloom_store::StoreError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
