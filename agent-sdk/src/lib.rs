//! Agent SDK - runtime core for swarm agents
//!
//! This crate provides:
//! - `Agent` trait and `BaseAgent` run loop (setup once, tick per heartbeat)
//! - `McpClient` facade over local tools (`LocalClient`) and the host router (`HttpMcpClient`)
//! - Tool registry with explicit sync/async invocables
//! - Runtime configuration (host address, caller identity) loaded once per process
//! - Call and retry policies for remote side calls

pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod registry;
pub mod retry;

// Re-export commonly used types
pub use agent::{Agent, AgentContext, AgentState, BaseAgent, StopHandle};
pub use client::{CallPolicy, LocalClient, McpClient, McpClientExt};
pub use config::{AgentConfig, IdentityConfig, RuntimeConfig, DEFAULT_HOST_BASE};
pub use error::{AgentError, CallError, ConfigError};
pub use http::{identity_headers, CallEnvelope, HostRouter, HttpMcpClient};
pub use registry::{Invocable, Tool, ToolRegistry};
pub use retry::{RetryPolicy, RetryingClient};

pub use tokio_util::sync::CancellationToken;
