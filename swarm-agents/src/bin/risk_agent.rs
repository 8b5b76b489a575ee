use agent_sdk::{AgentConfig, BaseAgent, LocalClient};
use anyhow::Result;
use swarm_agents::agents::RiskAgent;

/// Risk-check the demo proposal once, submitting it if approved
#[tokio::main]
async fn main() -> Result<()> {
    swarm_agents::init_tracing();

    let router = swarm_agents::host_router()?;
    let config = AgentConfig::new("risk-agent")?.with_heartbeat_secs(5)?;
    let mut agent = BaseAgent::new(config, LocalClient::new(), RiskAgent::new(&router));

    swarm_agents::run_until_ctrl_c(&mut agent).await
}
