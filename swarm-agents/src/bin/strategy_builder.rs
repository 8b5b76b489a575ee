use agent_sdk::{AgentConfig, BaseAgent, LocalClient};
use anyhow::Result;
use swarm_agents::agents::StrategyBuilderAgent;

/// Backtest the candidate thresholds once and publish a draft plan
#[tokio::main]
async fn main() -> Result<()> {
    swarm_agents::init_tracing();

    let router = swarm_agents::host_router()?;
    let config = AgentConfig::new("strategy-builder")?.with_heartbeat_secs(5)?;
    let mut agent = BaseAgent::new(config, LocalClient::new(), StrategyBuilderAgent::new(&router));

    swarm_agents::run_until_ctrl_c(&mut agent).await
}
