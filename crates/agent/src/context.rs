//! Everything one run needs, passed explicitly
//!
//! A [`RunContext`] bundles the provider, the state layout, the tool registry and
//! the limits of a run. Stages build their agents from it instead of reaching for
//! globals.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use taskloom_config::Config;
use taskloom_provider::Provider;
use taskloom_store::StateLayout;

use crate::agent::Agent;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::tools::ToolRegistry;

const DEFAULT_MAX_ROUNDS: u32 = 30;
const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct RunContext {
    provider: Arc<dyn Provider>,
    layout: StateLayout,
    workspace: PathBuf,
    tools: Arc<ToolRegistry>,
    retry: RetryPolicy,
    max_rounds: u32,
    model: String,
    max_tokens: u32,
    temperature: f32,
    cancel: CancellationToken,
}

impl RunContext {
    /// Context with default limits and the built-in tools
    pub fn new(
        provider: Arc<dyn Provider>,
        state_dir: impl AsRef<Path>,
        workspace: impl AsRef<Path>,
    ) -> Self {
        let workspace = workspace.as_ref().to_path_buf();
        let model = provider.default_model();
        Self {
            tools: Arc::new(ToolRegistry::with_defaults(&workspace, DEFAULT_EXEC_TIMEOUT)),
            provider,
            layout: StateLayout::new(state_dir),
            workspace,
            retry: RetryPolicy::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            model,
            max_tokens: 4096,
            temperature: 0.7,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &Config, provider: Arc<dyn Provider>) -> Self {
        let workspace = config.workspace_path();
        let defaults = &config.agent.defaults;
        let exec_timeout = Duration::from_secs(config.tools.exec_timeout_secs);

        Self::new(provider, config.state_path(), &workspace)
            .with_tools(ToolRegistry::with_defaults(&workspace, exec_timeout))
            .with_retry(RetryPolicy::from(&config.retry))
            .with_max_rounds(config.max_rounds())
            .with_model(defaults.model.clone(), defaults.max_tokens, defaults.temperature)
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        self.model = model.into();
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Agent for one stage, sharing this run's provider, limits and cancellation
    pub fn agent(&self, name: &str, system_prompt: impl Into<String>) -> Agent {
        let retry = RetryExecutor::new(self.retry.clone()).with_cancel(self.cancel.clone());
        Agent::new(name, system_prompt, self.provider.clone(), retry).with_model(
            self.model.clone(),
            self.max_tokens,
            self.temperature,
        )
    }
}
