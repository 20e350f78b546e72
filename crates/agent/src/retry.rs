//! Bounded retry with a per-attempt deadline
//!
//! Each attempt runs on its own tokio task with a child [`CancellationToken`].
//! When the deadline passes the token is cancelled and the task aborted; work
//! that ignores the token may still finish in the background, but its result is
//! discarded.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use taskloom_config::RetryConfig;

/// Retry limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(180),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.delay(),
            attempt_timeout: config.attempt_timeout(),
        }
    }
}

/// Why the last attempt failed
#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error("attempt timed out")]
    Timeout,

    #[error("{0}")]
    Failed(E),

    #[error("cancelled")]
    Cancelled,

    #[error("attempt panicked")]
    Panicked,
}

/// Runs an operation up to `max_attempts` times
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop retrying (and abort the running attempt) once `cancel` fires
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn run<F, Fut, T, E>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: Fn(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = RetryError::Timeout;

        for attempt in 1..=attempts {
            if self.cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let token = self.cancel.child_token();
            let mut handle = tokio::spawn(op(token.clone()));

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => {
                    token.cancel();
                    handle.abort();
                    return Err(RetryError::Cancelled);
                }
                outcome = tokio::time::timeout(self.policy.attempt_timeout, &mut handle) => outcome,
            };

            last_error = match outcome {
                Ok(Ok(Ok(value))) => {
                    if attempt > 1 {
                        debug!(attempt, "Attempt succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Ok(Err(e))) => {
                    warn!(attempt, max_attempts = attempts, error = %e, "Attempt failed");
                    RetryError::Failed(e)
                }
                Ok(Err(join_error)) => {
                    warn!(attempt, max_attempts = attempts, error = %join_error, "Attempt panicked");
                    RetryError::Panicked
                }
                Err(_) => {
                    token.cancel();
                    handle.abort();
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        timeout_secs = self.policy.attempt_timeout.as_secs(),
                        "Attempt timed out"
                    );
                    RetryError::Timeout
                }
            };

            if attempt < attempts && !self.policy.delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = sleep(self.policy.delay) => {}
                }
            }
        }

        Err(last_error)
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
