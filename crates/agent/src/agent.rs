//! One agent type for every stage
//!
//! Stages differ only in their system prompt and in how they read the reply, so
//! an [`Agent`] is a system prompt plus a retried provider, and the reply shape is
//! a [`ResponseContract`] chosen per call.

use std::sync::Arc;

use tracing::{debug, info};

use taskloom_provider::{ChatParams, ChatResponse, Message, Provider, ProviderError};
use taskloom_store::OperationRecord;

use crate::retry::{RetryError, RetryExecutor};
use crate::{AgentError, Result};

/// How a stage interprets a model reply
pub trait ResponseContract: Sized {
    fn parse(response: &ChatResponse) -> Result<Self>;
}

/// System prompt bound to a provider
#[derive(Clone)]
pub struct Agent {
    name: String,
    system_prompt: String,
    provider: Arc<dyn Provider>,
    retry: RetryExecutor,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        provider: Arc<dyn Provider>,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            provider,
            retry,
            model: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        self.model = model.into();
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Send a full message list through the retry executor
    pub async fn send(&self, messages: Vec<Message>) -> Result<ChatResponse> {
        let params = ChatParams {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        debug!(agent = %self.name, messages = params.messages.len(), "Sending to model");

        let provider = self.provider.clone();
        let response = self
            .retry
            .run(move |_token| {
                let provider = provider.clone();
                let params = params.clone();
                async move { provider.chat(params).await }
            })
            .await
            .map_err(remote_error)?;

        info!(
            agent = %self.name,
            tokens = response.usage.total_tokens,
            finish_reason = %response.finish_reason,
            "Model replied"
        );
        Ok(response)
    }

    /// Single-shot request: system prompt plus one user message
    pub async fn ask<C: ResponseContract>(&self, prompt: &str) -> Result<C> {
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(prompt),
        ];
        let response = self.send(messages).await?;
        C::parse(&response)
    }
}

/// Wire messages for a sequence of log records
pub fn to_messages<'a>(records: impl IntoIterator<Item = &'a OperationRecord>) -> Vec<Message> {
    records
        .into_iter()
        .map(|record| {
            let (role, content) = record.wire();
            Message::new(role, content)
        })
        .collect()
}

fn remote_error(error: RetryError<ProviderError>) -> AgentError {
    match error {
        RetryError::Timeout => AgentError::Timeout,
        RetryError::Cancelled => AgentError::Cancelled,
        RetryError::Failed(e) => AgentError::Remote(e.to_string()),
        RetryError::Panicked => AgentError::Remote("provider call panicked".to_string()),
    }
}
