//! Liveness agent that reports through a local telemetry tool

use agent_sdk::{Agent, AgentContext, Invocable, LocalClient, McpClient};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

pub const TELEMETRY_LOG: &str = "telemetry.log";

/// Registers a local telemetry tool and reports a heartbeat through it every tick
#[derive(Debug, Default)]
pub struct HeartbeatAgent {
    beats: u64,
}

impl HeartbeatAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beats(&self) -> u64 {
        self.beats
    }
}

fn log_telemetry(payload: Value) -> Result<Value> {
    info!("[telemetry] {}", payload);
    Ok(Value::Null)
}

#[async_trait]
impl Agent for HeartbeatAgent {
    type Client = LocalClient;

    async fn setup(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        ctx.client_mut()
            .register(TELEMETRY_LOG, Invocable::sync(log_telemetry));
        Ok(())
    }

    async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        let payload = json!({
            "level": "info",
            "msg": "heartbeat",
            "agent": ctx.config().name(),
        });
        ctx.client().call(TELEMETRY_LOG, payload).await?;
        self.beats += 1;
        Ok(())
    }
}
