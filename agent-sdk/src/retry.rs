//! Opt-in retry with exponential backoff for any [`McpClient`]

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::client::McpClient;
use crate::error::CallError;

/// Retry behaviour for transient remote failures.
///
/// Only transport failures and 5xx responses are retried; missing tools,
/// 4xx responses and errors raised by local tools are returned at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retrying
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }

    pub fn exponential(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    pub fn is_retryable(&self, err: &anyhow::Error) -> bool {
        err.downcast_ref::<CallError>()
            .is_some_and(CallError::is_transient)
    }
}

/// Wraps a client and re-issues transient failures per [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: McpClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<C: McpClient> McpClient for RetryingClient<C> {
    async fn call(&self, tool: &str, payload: Value) -> Result<Value> {
        let mut attempt = 1;
        loop {
            match self.inner.call(tool, payload.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.policy.max_attempts && self.policy.is_retryable(&e) => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "Call to {} failed (attempt {}/{}), retrying in {:?}: {:#}",
                        tool, attempt, self.policy.max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
