//! Typed failures carried inside `anyhow::Error`
//!
//! Library seams return `anyhow::Result`; callers that need to branch on the
//! failure kind use `err.downcast_ref::<CallError>()` and friends.

use thiserror::Error;

/// Invalid configuration, rejected when the config value is built
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("heartbeat_seconds must be within [{min}, {max}], got {value}")]
    InvalidHeartbeat { value: u64, min: u64, max: u64 },

    #[error("agent name must not be empty")]
    EmptyName,

    #[error("identity value for header `{header}` is not a valid header value")]
    InvalidHeader { header: &'static str },

    #[error("failed to load runtime configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Failures of a single tool invocation
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("tool `{name}` panicked")]
    ToolPanicked { name: String },

    #[error("remote call {service}/{tool} failed with status {status}: {body}")]
    RemoteStatus {
        service: String,
        tool: String,
        status: u16,
        body: String,
    },

    #[error("remote call {service}/{tool} failed: {source}")]
    RemoteTransport {
        service: String,
        tool: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server accepted the call but its body is not JSON. Never retried:
    /// the request already took effect.
    #[error("remote call {service}/{tool} returned an undecodable body: {source}")]
    RemoteDecode {
        service: String,
        tool: String,
        #[source]
        source: reqwest::Error,
    },
}

impl CallError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            CallError::RemoteTransport { .. } => true,
            CallError::RemoteStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status for non-success remote responses
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::RemoteStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Lifecycle misuse of a [`crate::BaseAgent`]
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent `{name}` has already been started")]
    AlreadyStarted { name: String },
}
