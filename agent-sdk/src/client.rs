//! Tool invocation facade
//!
//! [`McpClient`] is the one operation agents depend on: call a named tool
//! with a JSON payload. [`LocalClient`] dispatches in-process through a
//! [`ToolRegistry`]; [`crate::HttpMcpClient`] goes through the host router.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::registry::{Invocable, ToolRegistry};

/// Invoke a named tool with a structured payload
#[async_trait]
pub trait McpClient: Send + Sync {
    async fn call(&self, tool: &str, payload: Value) -> Result<Value>;
}

#[async_trait]
impl<C: McpClient + ?Sized> McpClient for Arc<C> {
    async fn call(&self, tool: &str, payload: Value) -> Result<Value> {
        (**self).call(tool, payload).await
    }
}

#[async_trait]
impl<C: McpClient + ?Sized> McpClient for Box<C> {
    async fn call(&self, tool: &str, payload: Value) -> Result<Value> {
        (**self).call(tool, payload).await
    }
}

/// In-process client backed by its own tool registry
#[derive(Debug, Default)]
pub struct LocalClient {
    registry: ToolRegistry,
}

impl LocalClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Store or replace the tool under `name`
    pub fn register(&mut self, name: impl Into<String>, invocable: Invocable) {
        self.registry.register(name, invocable);
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

#[async_trait]
impl McpClient for LocalClient {
    async fn call(&self, tool: &str, payload: Value) -> Result<Value> {
        debug!("Local call to {}", tool);
        self.registry.call(tool, payload).await
    }
}

/// How a caller treats the failure of one particular call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallPolicy {
    /// Failure is returned to the caller
    #[default]
    Required,
    /// Failure is logged and swallowed; the call yields `None`
    BestEffort,
}

/// Policy-aware calling on top of any [`McpClient`]
#[async_trait]
pub trait McpClientExt: McpClient {
    /// Call `tool`, applying `policy` to a failure.
    ///
    /// `Required` returns `Ok(Some(value))` or the error; `BestEffort`
    /// returns `Ok(None)` on failure.
    async fn call_with(
        &self,
        policy: CallPolicy,
        tool: &str,
        payload: Value,
    ) -> Result<Option<Value>> {
        match self.call(tool, payload).await {
            Ok(value) => Ok(Some(value)),
            Err(e) => match policy {
                CallPolicy::Required => Err(e),
                CallPolicy::BestEffort => {
                    warn!("Best-effort call to {} failed: {:#}", tool, e);
                    Ok(None)
                }
            },
        }
    }
}

impl<C: McpClient + ?Sized> McpClientExt for C {}
