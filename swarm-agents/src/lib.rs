//! Swarm agents - concrete agents built on the agent SDK
//!
//! Each agent lives in [`agents`] and has a matching binary under `src/bin`.
//! Remote services are reached through the host router; see [`tools`] for
//! the typed wrappers around the tool calls they share.

pub mod agents;
pub mod indicators;
pub mod tools;

use agent_sdk::{Agent, BaseAgent, CancellationToken, HostRouter, RuntimeConfig};
use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Router for the host named by the process environment
pub fn host_router() -> Result<HostRouter> {
    let config = RuntimeConfig::from_env()?;
    let router = HostRouter::new(config)?;
    info!("Using host router at {}", router.host_base());
    Ok(router)
}

/// Run `agent` until it stops itself or Ctrl-C is pressed
pub async fn run_until_ctrl_c<A: Agent>(agent: &mut BaseAgent<A>) -> Result<()> {
    let cancel = CancellationToken::new();

    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down gracefully...");
                cancel.cancel();
            }
        }
    });

    let result = agent.run(cancel).await;
    watcher.abort();
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    use agent_sdk::{CallError, Invocable, LocalClient};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    use crate::tools::Service;

    /// Every `(tool, payload)` the fake services received, in call order
    pub type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

    pub fn call_log() -> CallLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn calls_to(log: &CallLog, tool: &str) -> Vec<Value> {
        log.lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == tool)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn tools_called(log: &CallLog) -> Vec<String> {
        log.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Service answering each tool with a canned response
    pub fn fake_service(log: &CallLog, responses: Vec<(&'static str, Value)>) -> Service {
        let mut client = LocalClient::new();
        for (tool, response) in responses {
            let log = Arc::clone(log);
            client.register(
                tool,
                Invocable::sync(move |payload| {
                    log.lock().unwrap().push((tool.to_string(), payload));
                    Ok(response.clone())
                }),
            );
        }
        Arc::new(client)
    }

    /// Service whose tool always answers with an HTTP error status
    pub fn failing_service(log: &CallLog, service: &'static str, tool: &'static str) -> Service {
        let mut client = LocalClient::new();
        let log = Arc::clone(log);
        client.register(
            tool,
            Invocable::sync(move |payload| {
                log.lock().unwrap().push((tool.to_string(), payload));
                Err(CallError::RemoteStatus {
                    service: service.to_string(),
                    tool: tool.to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                }
                .into())
            }),
        );
        Arc::new(client)
    }

    /// `get_ohlcv` response with one daily bar per close, starting 2024-01-01
    pub fn ohlcv_rows(closes: &[f64]) -> Value {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows: Vec<Value> = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let ts = start + Duration::days(i as i64);
                json!({
                    "ts": ts.to_rfc3339(),
                    "open": close,
                    "high": close,
                    "low": close,
                    "close": close,
                    "volume": 1000
                })
            })
            .collect();
        json!({ "rows": rows })
    }
}
