//! Local-only walkthrough of the agent SDK
//!
//! Registers one sync and one async tool, then runs an agent that calls both
//! on every tick and stops itself after three ticks. No host router needed:
//!
//! ```text
//! cargo run -p agent-sdk --example demo
//! ```

use agent_sdk::{
    Agent, AgentConfig, AgentContext, BaseAgent, CancellationToken, Invocable, LocalClient,
    McpClient,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, Level};

struct DemoAgent {
    ticks: u32,
}

#[async_trait]
impl Agent for DemoAgent {
    type Client = LocalClient;

    async fn setup(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        let client = ctx.client_mut();

        client.register(
            "math.add",
            Invocable::sync(|payload: Value| {
                let a = payload["a"].as_f64().unwrap_or_default();
                let b = payload["b"].as_f64().unwrap_or_default();
                Ok(json!({ "sum": a + b }))
            }),
        );

        client.register(
            "clock.wait",
            Invocable::asynchronous(|payload: Value| async move {
                let ms = payload["ms"].as_u64().unwrap_or(10);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, anyhow::Error>(json!({ "waited_ms": ms }))
            }),
        );

        info!("Registered tools: {:?}", client.registry().names());
        Ok(())
    }

    async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        self.ticks += 1;

        let sum = ctx
            .client()
            .call("math.add", json!({ "a": self.ticks, "b": 0.5 }))
            .await?;
        let waited = ctx.client().call("clock.wait", json!({ "ms": 20 })).await?;
        info!("Tick {}: {} {}", self.ticks, sum, waited);

        if self.ticks == 3 {
            ctx.stop();
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AgentConfig::new("demo-agent")?
        .with_description("Calls two local tools per tick")
        .with_heartbeat_secs(5)?;
    let mut agent = BaseAgent::new(config, LocalClient::new(), DemoAgent { ticks: 0 });

    tokio::select! {
        result = agent.run(CancellationToken::new()) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down gracefully...");
        }
    }

    Ok(())
}
