//! Pre-trade risk checks against the broker book

use agent_sdk::{Agent, AgentContext, HostRouter, LocalClient, McpClient};
use anyhow::Result;
use async_trait::async_trait;
use common::ApprovalStatus;
use serde_json::{json, Value};
use tracing::info;

use super::DEFAULT_SYMBOL;
use crate::tools::{self, Service, GET_FILLS, GET_POSITIONS, PRETRADE_CHECK, SUBMIT_ORDER};

/// What one risk tick saw and did
#[derive(Debug, Clone, PartialEq)]
pub struct RiskReport {
    pub decision: Value,
    pub status: Option<ApprovalStatus>,
    pub order: Option<Value>,
    pub positions: Value,
    pub fills: Value,
}

/// Runs a pre-trade check and submits the order only when it is approved
pub struct RiskAgent {
    risk_engine: Service,
    broker: Service,
    symbol: String,
    last_report: Option<RiskReport>,
}

impl RiskAgent {
    pub fn new(router: &HostRouter) -> Self {
        Self::with_services(
            tools::service(router, "risk-engine"),
            tools::service(router, "broker-gateway"),
        )
    }

    pub fn with_services(risk_engine: Service, broker: Service) -> Self {
        Self {
            risk_engine,
            broker,
            symbol: DEFAULT_SYMBOL.to_string(),
            last_report: None,
        }
    }

    pub fn last_report(&self) -> Option<&RiskReport> {
        self.last_report.as_ref()
    }
}

#[async_trait]
impl Agent for RiskAgent {
    type Client = LocalClient;

    async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        let proposal = json!({
            "symbol": self.symbol,
            "side": "BUY",
            "qty": 1,
            "price": 100,
            "limits": {"maxGross": 100000, "maxSingle": 10000},
            "current": [],
        });
        let decision = self.risk_engine.call(PRETRADE_CHECK, proposal).await?;
        let status = decision
            .get("status")
            .cloned()
            .and_then(|s| serde_json::from_value::<ApprovalStatus>(s).ok());

        // ADJUSTED is not an approval to trade as proposed
        let order = if status == Some(ApprovalStatus::Approved) {
            let order = json!({"symbol": self.symbol, "side": "BUY", "qty": 1});
            Some(self.broker.call(SUBMIT_ORDER, order).await?)
        } else {
            info!("Pre-trade check returned {:?}, not submitting", status);
            None
        };

        let positions = self.broker.call(GET_POSITIONS, json!({})).await?;
        let fills = self.broker.call(GET_FILLS, json!({})).await?;

        info!(
            "Risk decision {:?}, order submitted: {}",
            status,
            order.is_some()
        );
        self.last_report = Some(RiskReport {
            decision,
            status,
            order,
            positions,
            fills,
        });
        ctx.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{call_log, calls_to, fake_service, tools_called, CallLog};
    use agent_sdk::{AgentConfig, BaseAgent, CancellationToken};

    fn agent_with(log: &CallLog, status: &str) -> BaseAgent<RiskAgent> {
        let risk = fake_service(
            log,
            vec![(PRETRADE_CHECK, json!({"status": status, "breaches": []}))],
        );
        let broker = fake_service(
            log,
            vec![
                (SUBMIT_ORDER, json!({"order_id": "o-1", "status": "FILLED"})),
                (GET_POSITIONS, json!({"positions": [{"symbol": "AAPL", "qty": 1}]})),
                (GET_FILLS, json!({"fills": []})),
            ],
        );
        BaseAgent::new(
            AgentConfig::new("risk-agent").unwrap(),
            LocalClient::new(),
            RiskAgent::with_services(risk, broker),
        )
    }

    #[tokio::test]
    async fn test_approved_trade_is_submitted() {
        let log = call_log();
        let mut agent = agent_with(&log, "APPROVED");
        agent.run(CancellationToken::new()).await.unwrap();

        assert_eq!(
            tools_called(&log),
            vec![PRETRADE_CHECK, SUBMIT_ORDER, GET_POSITIONS, GET_FILLS]
        );
        assert_eq!(
            calls_to(&log, SUBMIT_ORDER)[0],
            json!({"symbol": "AAPL", "side": "BUY", "qty": 1})
        );

        let report = agent.agent().last_report().unwrap();
        assert_eq!(report.status, Some(ApprovalStatus::Approved));
        assert_eq!(report.order.as_ref().unwrap()["order_id"], "o-1");
        assert_eq!(report.positions["positions"][0]["qty"], 1);
    }

    #[tokio::test]
    async fn test_rejected_trade_is_not_submitted() {
        let log = call_log();
        let mut agent = agent_with(&log, "REJECTED");
        agent.run(CancellationToken::new()).await.unwrap();

        assert_eq!(tools_called(&log), vec![PRETRADE_CHECK, GET_POSITIONS, GET_FILLS]);
        let report = agent.agent().last_report().unwrap();
        assert_eq!(report.status, Some(ApprovalStatus::Rejected));
        assert!(report.order.is_none());
    }

    #[tokio::test]
    async fn test_adjusted_trade_is_not_submitted() {
        let log = call_log();
        let mut agent = agent_with(&log, "ADJUSTED");
        agent.run(CancellationToken::new()).await.unwrap();

        assert!(calls_to(&log, SUBMIT_ORDER).is_empty());
    }
}
