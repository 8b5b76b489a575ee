//! Remote tool calls through the host router
//!
//! Wire contract: `POST {host_base}/call/{service}` with body
//! `{"tool": <name>, "input": <payload>}`. A 2xx response body is returned
//! as-is; anything else fails with [`CallError::RemoteStatus`]. A 2xx body
//! that is not JSON fails with [`CallError::RemoteDecode`], which is never
//! retried. One request per call, no retries at this layer (see
//! [`crate::RetryingClient`]).

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::McpClient;
use crate::config::{IdentityConfig, RuntimeConfig, DEFAULT_HOST_BASE};
use crate::error::{CallError, ConfigError};

pub const AGENT_ID_HEADER: &str = "x-agent-id";
pub const AGENT_ROLE_HEADER: &str = "x-agent-role";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Request body of a remote tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub tool: String,
    pub input: Value,
}

/// Headers carrying the caller identity. Unset or empty fields produce no header.
pub fn identity_headers(identity: &IdentityConfig) -> Result<HeaderMap, ConfigError> {
    fn set(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    let mut headers = HeaderMap::new();

    let plain = [
        (AGENT_ID_HEADER, set(&identity.agent_id)),
        (AGENT_ROLE_HEADER, set(&identity.agent_role)),
        (CORRELATION_ID_HEADER, set(&identity.trace_id)),
    ];
    for (header, value) in plain {
        if let Some(value) = value {
            let value =
                HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader { header })?;
            headers.insert(HeaderName::from_static(header), value);
        }
    }

    if let Some(key) = set(&identity.api_key) {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|_| {
            ConfigError::InvalidHeader {
                header: "authorization",
            }
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// Client bound to one `(host, service)` pair of the host router
#[derive(Debug, Clone)]
pub struct HttpMcpClient {
    http: reqwest::Client,
    host_base: String,
    service: String,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpMcpClient {
    /// Standalone client with its own connection pool
    pub fn new(
        host_base: &str,
        service: impl Into<String>,
        config: &RuntimeConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_parts(
            reqwest::Client::new(),
            host_base,
            service.into(),
            identity_headers(&config.identity)?,
            config.request_timeout(),
        ))
    }

    fn from_parts(
        http: reqwest::Client,
        host_base: &str,
        service: String,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            host_base: host_base.trim_end_matches('/').to_string(),
            service,
            headers,
            timeout,
        }
    }

    pub fn host_base(&self) -> &str {
        &self.host_base
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Endpoint every call of this client is posted to
    pub fn url(&self) -> String {
        format!("{}/call/{}", self.host_base, self.service)
    }

    fn transport_error(&self, tool: &str, source: reqwest::Error) -> CallError {
        CallError::RemoteTransport {
            service: self.service.clone(),
            tool: tool.to_string(),
            source,
        }
    }
}

#[async_trait]
impl McpClient for HttpMcpClient {
    async fn call(&self, tool: &str, payload: Value) -> Result<Value> {
        let url = self.url();
        debug!("Remote call {} -> {}", tool, url);

        let envelope = CallEnvelope {
            tool: tool.to_string(),
            input: payload,
        };

        let response = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| self.transport_error(tool, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(
                        "Could not read {} error body from {}/{}: {}",
                        status, self.service, tool, e
                    );
                    String::new()
                }
            };
            warn!("Remote call {}/{} returned {}: {}", self.service, tool, status, body);
            return Err(CallError::RemoteStatus {
                service: self.service.clone(),
                tool: tool.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        // past this point the server has acted on the request
        let value = response
            .json::<Value>()
            .await
            .map_err(|source| CallError::RemoteDecode {
                service: self.service.clone(),
                tool: tool.to_string(),
                source,
            })?;
        Ok(value)
    }
}

/// Hands out remote clients for services behind one host router.
///
/// Holds the runtime config and a shared connection pool; every client it
/// creates carries the same identity headers and timeout.
#[derive(Debug, Clone)]
pub struct HostRouter {
    http: reqwest::Client,
    host_base: String,
    headers: HeaderMap,
    config: RuntimeConfig,
}

impl HostRouter {
    /// Router at the configured `HOST_URL`, or the local default
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        let host_base = config.host_base(DEFAULT_HOST_BASE);
        Self::with_host_base(config, &host_base)
    }

    pub fn with_host_base(config: RuntimeConfig, host_base: &str) -> Result<Self, ConfigError> {
        let headers = identity_headers(&config.identity)?;
        Ok(Self {
            http: reqwest::Client::new(),
            host_base: host_base.trim_end_matches('/').to_string(),
            headers,
            config,
        })
    }

    pub fn host_base(&self) -> &str {
        &self.host_base
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Client for `service`; cheap, safe to call per tick
    pub fn service(&self, service: &str) -> HttpMcpClient {
        HttpMcpClient::from_parts(
            self.http.clone(),
            &self.host_base,
            service.to_string(),
            self.headers.clone(),
            self.config.request_timeout(),
        )
    }
}
