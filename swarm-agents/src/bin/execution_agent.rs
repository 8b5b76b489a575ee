use agent_sdk::{AgentConfig, BaseAgent, LocalClient};
use anyhow::Result;
use swarm_agents::agents::execution::{ExecutionAgent, DEFAULT_THRESHOLD};

/// Replay the threshold strategy once and report the execution stat
#[tokio::main]
async fn main() -> Result<()> {
    swarm_agents::init_tracing();

    let router = swarm_agents::host_router()?;
    let config = AgentConfig::new("execution-agent")?.with_heartbeat_secs(5)?;
    let agent = ExecutionAgent::new(&router, DEFAULT_THRESHOLD);
    tracing::info!("Correlation id {}", agent.correlation_id());

    let mut agent = BaseAgent::new(config, LocalClient::new(), agent);
    swarm_agents::run_until_ctrl_c(&mut agent).await
}
