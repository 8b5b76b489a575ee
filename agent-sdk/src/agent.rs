//! Agent trait and the run loop that drives it
//!
//! An agent supplies two hooks: `setup`, called once, and `tick`, called
//! repeatedly with a heartbeat wait in between. [`BaseAgent`] owns the agent,
//! its configuration and its client, and runs the loop:
//!
//! `Created -> Running -> Stopped`
//!
//! The loop ends when the stop flag is set (from anywhere, including inside
//! `tick`) or the run's cancellation token fires. Either way `run` returns
//! `Ok(())`. Failures from `setup` or `tick` end the loop and are returned.

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::McpClient;
use crate::config::AgentConfig;
use crate::error::AgentError;

/// Lifecycle state of a [`BaseAgent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Created,
    Running,
    Stopped,
}

/// Cloneable handle to an agent's stop flag.
///
/// The flag only ever goes from unset to set; stopping twice is a no-op.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the flag is set
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }
}

/// What the hooks see: configuration, the agent's own client, the stop flag
#[derive(Debug)]
pub struct AgentContext<C> {
    config: AgentConfig,
    client: C,
    stop: StopHandle,
}

impl<C> AgentContext<C> {
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Mutable access, used by `setup` to register local tools
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Ask the loop to end after the current tick
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

/// Unit of work driven by [`BaseAgent`]
#[async_trait]
pub trait Agent: Send {
    /// Client the agent dispatches its own tool calls through
    type Client: McpClient;

    /// Prepare resources. Called once before the first tick.
    async fn setup(&mut self, _ctx: &mut AgentContext<Self::Client>) -> Result<()> {
        Ok(())
    }

    /// One iteration of work
    async fn tick(&mut self, ctx: &mut AgentContext<Self::Client>) -> Result<()>;
}

/// Owns one agent and runs its lifecycle
pub struct BaseAgent<A: Agent> {
    agent: A,
    ctx: AgentContext<A::Client>,
    state: AgentState,
}

impl<A: Agent> std::fmt::Debug for BaseAgent<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseAgent")
            .field("config", &self.ctx.config)
            .field("state", &self.state)
            .field("stopped", &self.ctx.is_stopped())
            .finish()
    }
}

impl<A: Agent> BaseAgent<A> {
    pub fn new(config: AgentConfig, client: A::Client, agent: A) -> Self {
        Self {
            agent,
            ctx: AgentContext {
                config,
                client,
                stop: StopHandle::new(),
            },
            state: AgentState::Created,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.ctx.config
    }

    pub fn client(&self) -> &A::Client {
        &self.ctx.client
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.ctx.stop_handle()
    }

    /// Set the stop flag. Idempotent, valid in any state.
    pub fn stop(&self) {
        self.ctx.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.ctx.is_stopped()
    }

    /// Run `setup` once, then `tick` every heartbeat until stopped or cancelled.
    ///
    /// An agent runs at most once; a second call fails with
    /// [`AgentError::AlreadyStarted`].
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        if self.state != AgentState::Created {
            return Err(AgentError::AlreadyStarted {
                name: self.ctx.config.name().to_string(),
            }
            .into());
        }

        self.state = AgentState::Running;
        info!(
            "Starting agent {} v{} (heartbeat {}s)",
            self.ctx.config.name(),
            self.ctx.config.version(),
            self.ctx.config.heartbeat_secs()
        );

        let result = self.run_loop(&cancel).await;

        self.state = AgentState::Stopped;
        self.ctx.stop();
        match &result {
            Ok(()) => info!("Agent {} stopped", self.ctx.config.name()),
            Err(e) => error!("Agent {} failed: {:#}", self.ctx.config.name(), e),
        }
        result
    }

    async fn run_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.agent.setup(&mut self.ctx).await?;
        debug!("Agent {} setup complete", self.ctx.config.name());

        let heartbeat = self.ctx.config.heartbeat();
        let mut ticks: u64 = 0;

        loop {
            if self.ctx.is_stopped() {
                debug!("Stop requested, leaving loop after {} ticks", ticks);
                break;
            }
            if cancel.is_cancelled() {
                info!("Agent {} cancelled", self.ctx.config.name());
                break;
            }

            self.agent.tick(&mut self.ctx).await?;
            ticks += 1;
            debug!("Agent {} completed tick {}", self.ctx.config.name(), ticks);

            if self.ctx.is_stopped() {
                debug!("Stop requested during tick {}", ticks);
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(heartbeat) => {}
                _ = self.ctx.stop.stopped() => {
                    debug!("Stop requested during heartbeat wait");
                    break;
                }
                _ = cancel.cancelled() => {
                    info!("Agent {} cancelled during heartbeat wait", self.ctx.config.name());
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalClient;
    use crate::registry::Invocable;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct CountingAgent {
        setups: u32,
        ticks: u32,
        stop_after: Option<u32>,
        fail_on_tick: Option<u32>,
    }

    #[async_trait]
    impl Agent for CountingAgent {
        type Client = LocalClient;

        async fn setup(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
            self.setups += 1;
            ctx.client_mut().register("echo", Invocable::sync(Ok));
            Ok(())
        }

        async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
            self.ticks += 1;
            ctx.client().call("echo", json!({"tick": self.ticks})).await?;
            if self.fail_on_tick == Some(self.ticks) {
                anyhow::bail!("tick {} failed", self.ticks);
            }
            if self.stop_after == Some(self.ticks) {
                ctx.stop();
            }
            Ok(())
        }
    }

    fn agent(heartbeat: u64, inner: CountingAgent) -> BaseAgent<CountingAgent> {
        let config = AgentConfig::new("counting")
            .unwrap()
            .with_heartbeat_secs(heartbeat)
            .unwrap();
        BaseAgent::new(config, LocalClient::new(), inner)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_inside_first_tick_skips_sleep() {
        let mut agent = agent(
            5,
            CountingAgent {
                stop_after: Some(1),
                ..Default::default()
            },
        );

        let start = tokio::time::Instant::now();
        agent.run(CancellationToken::new()).await.unwrap();

        assert_eq!(agent.agent().setups, 1);
        assert_eq!(agent.agent().ticks, 1);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(agent.state(), AgentState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_spaced_by_heartbeat() {
        let mut agent = agent(
            10,
            CountingAgent {
                stop_after: Some(3),
                ..Default::default()
            },
        );

        let start = tokio::time::Instant::now();
        agent.run(CancellationToken::new()).await.unwrap();

        assert_eq!(agent.agent().ticks, 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(20), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(30), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_failure_propagates() {
        let mut agent = agent(
            5,
            CountingAgent {
                fail_on_tick: Some(2),
                ..Default::default()
            },
        );

        let err = agent.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "tick 2 failed");
        assert_eq!(agent.agent().ticks, 2);
        assert_eq!(agent.state(), AgentState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_heartbeat_is_silent() {
        let mut agent = agent(600, CountingAgent::default());
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        agent.run(cancel).await.unwrap();

        assert_eq!(agent.agent().ticks, 1);
        assert!(start.elapsed() < Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_handle_interrupts_heartbeat() {
        let mut agent = agent(300, CountingAgent::default());
        let handle = agent.stop_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            handle.stop();
        });

        let start = tokio::time::Instant::now();
        agent.run(CancellationToken::new()).await.unwrap();

        assert_eq!(agent.agent().ticks, 1);
        assert!(start.elapsed() < Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut agent = agent(5, CountingAgent::default());
        agent.stop();
        agent.stop();
        agent.stop_handle().stop();
        assert!(agent.is_stopped());

        // stopped before run: setup still happens, no tick
        agent.run(CancellationToken::new()).await.unwrap();
        assert_eq!(agent.agent().setups, 1);
        assert_eq!(agent.agent().ticks, 0);

        agent.stop();
        assert!(agent.is_stopped());
        assert_eq!(agent.state(), AgentState::Stopped);
    }

    #[tokio::test]
    async fn test_second_run_rejected() {
        let mut agent = agent(
            5,
            CountingAgent {
                stop_after: Some(1),
                ..Default::default()
            },
        );
        agent.run(CancellationToken::new()).await.unwrap();

        let err = agent.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AgentError>(),
            Some(AgentError::AlreadyStarted { .. })
        ));
        assert_eq!(agent.agent().setups, 1);
    }
}
