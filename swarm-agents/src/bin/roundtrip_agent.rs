use agent_sdk::{AgentConfig, BaseAgent, LocalClient};
use anyhow::Result;
use swarm_agents::agents::RoundtripAgent;

/// Copy one batch of closes into the feature store
#[tokio::main]
async fn main() -> Result<()> {
    swarm_agents::init_tracing();

    let router = swarm_agents::host_router()?;
    let config = AgentConfig::new("roundtrip-agent")?.with_heartbeat_secs(5)?;
    let mut agent = BaseAgent::new(config, LocalClient::new(), RoundtripAgent::new(&router));

    swarm_agents::run_until_ctrl_c(&mut agent).await
}
