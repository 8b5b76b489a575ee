use agent_sdk::{AgentConfig, BaseAgent, LocalClient};
use anyhow::Result;
use swarm_agents::agents::HeartbeatAgent;

/// Log a heartbeat through the local telemetry tool until Ctrl-C
#[tokio::main]
async fn main() -> Result<()> {
    swarm_agents::init_tracing();

    let config = AgentConfig::new("base-agent")?
        .with_description("Heartbeat through a locally registered telemetry tool");
    let mut agent = BaseAgent::new(config, LocalClient::new(), HeartbeatAgent::new());

    swarm_agents::run_until_ctrl_c(&mut agent).await
}
