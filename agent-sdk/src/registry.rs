//! Local tool registry
//!
//! A tool is a named invocable taking a JSON payload. The registrant picks
//! whether the invocable is synchronous or asynchronous; sync invocables are
//! run on the blocking pool so they never stall the agent's loop.

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::error::CallError;

type SyncFn = dyn Fn(Value) -> Result<Value> + Send + Sync;
type AsyncFn = dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// How a registered tool executes
#[derive(Clone)]
pub enum Invocable {
    /// Plain function, executed off the scheduling thread
    Sync(Arc<SyncFn>),
    /// Function returning a future, awaited in place
    Async(Arc<AsyncFn>),
}

impl Invocable {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Invocable::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Invocable::Async(Arc::new(move |payload| Box::pin(f(payload))))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Invocable::Async(_))
    }

    /// Run the invocable. Errors it returns come back unchanged.
    pub async fn invoke(&self, name: &str, payload: Value) -> Result<Value> {
        match self {
            Invocable::Async(f) => f(payload).await,
            Invocable::Sync(f) => {
                let f = Arc::clone(f);
                match tokio::task::spawn_blocking(move || f(payload)).await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => Err(CallError::ToolPanicked {
                        name: name.to_string(),
                    }
                    .into()),
                    Err(e) => Err(anyhow::anyhow!("tool `{}` was cancelled: {}", name, e)),
                }
            }
        }
    }
}

impl fmt::Debug for Invocable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocable::Sync(_) => f.write_str("Invocable::Sync"),
            Invocable::Async(_) => f.write_str("Invocable::Async"),
        }
    }
}

/// A named unit of work owned by one registry
#[derive(Debug, Clone)]
pub struct Tool {
    pub name: String,
    pub invocable: Invocable,
}

/// Name -> tool mapping. Registering an existing name replaces it.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, invocable: Invocable) {
        let name = name.into();
        let replaced = self
            .tools
            .insert(
                name.clone(),
                Tool {
                    name: name.clone(),
                    invocable,
                },
            )
            .is_some();
        debug!("Registered tool {} (replaced: {})", name, replaced);
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up `name` and run it with `payload`
    pub async fn call(&self, name: &str, payload: Value) -> Result<Value> {
        let tool = self.tools.get(name).ok_or_else(|| CallError::ToolNotFound {
            name: name.to_string(),
        })?;
        tool.invocable.invoke(&tool.name, payload).await
    }
}
