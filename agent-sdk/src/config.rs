//! Agent and runtime configuration
//!
//! [`AgentConfig`] describes one agent and is validated when it is built.
//! [`RuntimeConfig`] carries the process-wide settings (host router address,
//! caller identity, request timeout) and is loaded once at start-up, then
//! passed explicitly to whatever needs it.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;

pub const MIN_HEARTBEAT_SECS: u64 = 5;
pub const MAX_HEARTBEAT_SECS: u64 = 600;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;
pub const DEFAULT_AGENT_VERSION: &str = "0.1.0";

/// Host router address used when `HOST_URL` is not configured
pub const DEFAULT_HOST_BASE: &str = "http://localhost:4000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable naming an optional TOML file layered under the environment
pub const CONFIG_FILE_ENV: &str = "AGENT_CONFIG";

/// Validated agent configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAgentConfig", into = "RawAgentConfig")]
pub struct AgentConfig {
    name: String,
    version: String,
    description: Option<String>,
    heartbeat_secs: u64,
}

impl AgentConfig {
    /// Config with default version and heartbeat
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }

        Ok(Self {
            name,
            version: DEFAULT_AGENT_VERSION.to_string(),
            description: None,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
        })
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the heartbeat; values outside [5, 600] are rejected
    pub fn with_heartbeat_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        self.heartbeat_secs = validate_heartbeat(secs)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn heartbeat_secs(&self) -> u64 {
        self.heartbeat_secs
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

fn validate_heartbeat(secs: u64) -> Result<u64, ConfigError> {
    if (MIN_HEARTBEAT_SECS..=MAX_HEARTBEAT_SECS).contains(&secs) {
        Ok(secs)
    } else {
        Err(ConfigError::InvalidHeartbeat {
            value: secs,
            min: MIN_HEARTBEAT_SECS,
            max: MAX_HEARTBEAT_SECS,
        })
    }
}

/// Serialized form of [`AgentConfig`]; only reachable through validation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAgentConfig {
    name: String,
    #[serde(default = "default_agent_version")]
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default = "default_heartbeat_secs")]
    heartbeat_seconds: u64,
}

fn default_agent_version() -> String {
    DEFAULT_AGENT_VERSION.to_string()
}

fn default_heartbeat_secs() -> u64 {
    DEFAULT_HEARTBEAT_SECS
}

impl TryFrom<RawAgentConfig> for AgentConfig {
    type Error = ConfigError;

    fn try_from(raw: RawAgentConfig) -> Result<Self, Self::Error> {
        let mut config = AgentConfig::new(raw.name)?
            .with_version(raw.version)
            .with_heartbeat_secs(raw.heartbeat_seconds)?;
        config.description = raw.description;
        Ok(config)
    }
}

impl From<AgentConfig> for RawAgentConfig {
    fn from(config: AgentConfig) -> Self {
        Self {
            name: config.name,
            version: config.version,
            description: config.description,
            heartbeat_seconds: config.heartbeat_secs,
        }
    }
}

/// Caller identity attached to every outbound remote call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityConfig {
    pub agent_id: Option<String>,
    pub agent_role: Option<String>,
    pub api_key: Option<String>,
    pub trace_id: Option<String>,
}

/// Process-wide settings, loaded once and threaded into remote clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub host_url: Option<String>,
    pub identity: IdentityConfig,
    pub request_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host_url: None,
            identity: IdentityConfig::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Flat shape read by the `config` crate from file and environment
#[derive(Debug, Default, Deserialize)]
struct RawRuntimeConfig {
    host_url: Option<String>,
    agent_id: Option<String>,
    agent_role: Option<String>,
    api_key: Option<String>,
    trace_id: Option<String>,
    request_timeout_secs: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl From<RawRuntimeConfig> for RuntimeConfig {
    fn from(raw: RawRuntimeConfig) -> Self {
        Self {
            host_url: non_empty(raw.host_url),
            identity: IdentityConfig {
                agent_id: non_empty(raw.agent_id),
                agent_role: non_empty(raw.agent_role),
                api_key: non_empty(raw.api_key),
                trace_id: non_empty(raw.trace_id),
            },
            request_timeout_secs: raw
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl RuntimeConfig {
    /// Load from the process environment, layered over the file named by
    /// `AGENT_CONFIG` when that variable is set
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV).ok().filter(|p| !p.is_empty());
        Self::load(file.as_deref(), Environment::default())
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Result<Self, ConfigError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::load(None, Environment::default().source(Some(vars)))
    }

    /// Load a TOML file layered under an explicit variable map
    pub fn from_file_and_vars<K, V>(
        path: &str,
        vars: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ConfigError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::load(Some(path), Environment::default().source(Some(vars)))
    }

    fn load(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::with_name(path));
        }

        let raw: RawRuntimeConfig = builder
            .add_source(env.try_parsing(false))
            .build()?
            .try_deserialize()?;
        Ok(raw.into())
    }

    /// Host router base address: the configured `HOST_URL`, else `default`
    pub fn host_base(&self, default: &str) -> String {
        self.host_url
            .clone()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
