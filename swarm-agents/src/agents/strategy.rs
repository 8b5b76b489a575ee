//! Threshold strategy search over backtests

use agent_sdk::{Agent, AgentContext, CallPolicy, HostRouter, LocalClient, McpClient, McpClientExt};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ApprovalStatus, TradeAction, TradePlan, SCHEMA_VERSION};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::DEFAULT_SYMBOL;
use crate::tools::{self, OhlcvQuery, Service, BACKTEST_RUN, CONFIG_GET, PRETRADE_CHECK};

pub const TOPIC: &str = "trade_plan_drafts";
pub const CANDIDATES_KEY: &str = "strategy.candidates";
pub const DEFAULT_CANDIDATES: [f64; 3] = [0.2, 0.5, 1.0];
const PLAN_ID: &str = "plan_demo";

/// Price point sent to the backtester
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub ts: DateTime<Utc>,
    pub price: f64,
}

/// Backtest result for one threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateReport {
    pub threshold: f64,
    pub pnl: f64,
}

/// First report with the highest pnl
pub fn best_candidate(reports: &[CandidateReport]) -> Option<CandidateReport> {
    reports.iter().copied().fold(None, |best, report| match best {
        Some(b) if b.pnl >= report.pnl => Some(b),
        _ => Some(report),
    })
}

/// Threshold list from a `config.get` response, if it holds a usable one
fn parse_candidates(response: &Value) -> Option<Vec<f64>> {
    let candidates: Vec<f64> = response
        .get("value")?
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect::<Option<_>>()?;
    (!candidates.is_empty()).then_some(candidates)
}

/// Backtests threshold strategies, risk-checks the winner and publishes a
/// draft [`TradePlan`]
pub struct StrategyBuilderAgent {
    market_data: Service,
    backtester: Service,
    risk_engine: Service,
    bus: Service,
    config: Service,
    query: OhlcvQuery,
    last_plan: Option<TradePlan>,
    last_reports: Vec<CandidateReport>,
}

impl StrategyBuilderAgent {
    pub fn new(router: &HostRouter) -> Self {
        Self::with_services(
            tools::service(router, "market-data"),
            tools::service(router, "backtester"),
            tools::service(router, "risk-engine"),
            tools::service(router, "bus"),
            tools::service(router, "config"),
        )
    }

    pub fn with_services(
        market_data: Service,
        backtester: Service,
        risk_engine: Service,
        bus: Service,
        config: Service,
    ) -> Self {
        Self {
            market_data,
            backtester,
            risk_engine,
            bus,
            config,
            query: OhlcvQuery::daily(DEFAULT_SYMBOL, "2024-01-01", "2024-01-10"),
            last_plan: None,
            last_reports: Vec::new(),
        }
    }

    pub fn last_plan(&self) -> Option<&TradePlan> {
        self.last_plan.as_ref()
    }

    pub fn last_reports(&self) -> &[CandidateReport] {
        &self.last_reports
    }

    /// Candidate thresholds from the config service. Any failure or unusable
    /// value falls back to [`DEFAULT_CANDIDATES`].
    async fn candidates(&self) -> Result<Vec<f64>> {
        let response = self
            .config
            .call_with(CallPolicy::BestEffort, CONFIG_GET, json!({"key": CANDIDATES_KEY}))
            .await?;

        Ok(match response.as_ref().and_then(parse_candidates) {
            Some(candidates) => candidates,
            None => {
                debug!("Using default strategy candidates");
                DEFAULT_CANDIDATES.to_vec()
            }
        })
    }

    async fn backtest(&self, prices: &[PricePoint], threshold: f64) -> Result<CandidateReport> {
        let response = self
            .backtester
            .call(BACKTEST_RUN, json!({"prices": prices, "threshold": threshold}))
            .await?;
        let pnl = response
            .get("pnl")
            .and_then(Value::as_f64)
            .with_context(|| format!("{} response has no pnl", BACKTEST_RUN))?;
        Ok(CandidateReport { threshold, pnl })
    }
}

#[async_trait]
impl Agent for StrategyBuilderAgent {
    type Client = LocalClient;

    async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        let ohlcv = tools::get_ohlcv(self.market_data.as_ref(), &self.query).await?;
        let prices: Vec<PricePoint> = ohlcv
            .rows
            .iter()
            .map(|bar| PricePoint {
                ts: bar.ts,
                price: bar.close,
            })
            .collect();
        let last = prices
            .last()
            .cloned()
            .with_context(|| format!("market-data returned no bars for {}", self.query.symbol))?;

        let mut reports = Vec::new();
        for threshold in self.candidates().await? {
            reports.push(self.backtest(&prices, threshold).await?);
        }
        let best = best_candidate(&reports).context("no strategy candidates")?;

        let proposal = json!({
            "symbol": self.query.symbol,
            "side": "BUY",
            "qty": 1,
            "price": last.price,
            "limits": {"maxGross": 100000, "maxSingle": 10000},
            "current": [],
        });
        let decision = self.risk_engine.call(PRETRADE_CHECK, proposal).await?;
        let risk_status = decision
            .get("status")
            .cloned()
            .and_then(|s| serde_json::from_value::<ApprovalStatus>(s).ok());

        let plan = TradePlan {
            plan_id: PLAN_ID.to_string(),
            ts: last.ts,
            symbol: self.query.symbol.clone(),
            action: TradeAction::Buy,
            qty: 1.0,
            price: last.price,
            score: Some(best.pnl),
            risk_status,
            version: SCHEMA_VERSION.to_string(),
        };
        tools::publish(self.bus.as_ref(), TOPIC, &plan).await?;

        info!(
            "Chose threshold {} (pnl {:.2}) from {} candidates, risk {:?}",
            best.threshold,
            best.pnl,
            reports.len(),
            risk_status
        );
        self.last_reports = reports;
        self.last_plan = Some(plan);
        ctx.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        call_log, calls_to, failing_service, fake_service, ohlcv_rows, tools_called, CallLog,
    };
    use crate::tools::{GET_OHLCV, PUBLISH};
    use agent_sdk::{AgentConfig, BaseAgent, CancellationToken, Invocable};
    use std::sync::Arc;

    /// Backtester whose pnl is a function of the threshold
    fn backtester(log: &CallLog) -> Service {
        let log = Arc::clone(log);
        let mut client = LocalClient::new();
        client.register(
            BACKTEST_RUN,
            Invocable::sync(move |payload: Value| {
                let threshold = payload["threshold"].as_f64().unwrap_or_default();
                log.lock().unwrap().push((BACKTEST_RUN.to_string(), payload));
                // peaks at 0.5
                Ok(json!({"trades": 2, "pnl": 10.0 - (threshold - 0.5).abs() * 10.0}))
            }),
        );
        Arc::new(client)
    }

    fn agent_with(log: &CallLog, config: Service) -> BaseAgent<StrategyBuilderAgent> {
        let md = fake_service(log, vec![(GET_OHLCV, ohlcv_rows(&[100.0, 101.0, 102.5]))]);
        let risk = fake_service(log, vec![(PRETRADE_CHECK, json!({"status": "APPROVED", "breaches": []}))]);
        let bus = fake_service(log, vec![(PUBLISH, json!({}))]);

        BaseAgent::new(
            AgentConfig::new("strategy-builder").unwrap(),
            LocalClient::new(),
            StrategyBuilderAgent::with_services(md, backtester(log), risk, bus, config),
        )
    }

    #[test]
    fn test_best_candidate_prefers_first_on_tie() {
        let reports = [
            CandidateReport { threshold: 0.2, pnl: 5.0 },
            CandidateReport { threshold: 0.5, pnl: 7.0 },
            CandidateReport { threshold: 1.0, pnl: 7.0 },
        ];
        assert_eq!(best_candidate(&reports).unwrap().threshold, 0.5);
        assert_eq!(best_candidate(&[]), None);
    }

    #[test]
    fn test_parse_candidates() {
        assert_eq!(parse_candidates(&json!({"value": [0.1, 2]})), Some(vec![0.1, 2.0]));
        assert_eq!(parse_candidates(&json!({"value": []})), None);
        assert_eq!(parse_candidates(&json!({"value": "0.3"})), None);
        assert_eq!(parse_candidates(&json!({"value": [0.1, "x"]})), None);
        assert_eq!(parse_candidates(&json!({})), None);
    }

    #[tokio::test]
    async fn test_configured_candidates_backtested_and_best_published() {
        let log = call_log();
        let config = fake_service(&log, vec![(CONFIG_GET, json!({"value": [0.1, 0.5, 0.9]}))]);
        let mut agent = agent_with(&log, config);
        agent.run(CancellationToken::new()).await.unwrap();

        assert_eq!(
            tools_called(&log),
            vec![GET_OHLCV, CONFIG_GET, BACKTEST_RUN, BACKTEST_RUN, BACKTEST_RUN, PRETRADE_CHECK, PUBLISH]
        );
        assert_eq!(calls_to(&log, CONFIG_GET)[0], json!({"key": "strategy.candidates"}));

        let backtest = &calls_to(&log, BACKTEST_RUN)[0];
        assert_eq!(backtest["prices"].as_array().unwrap().len(), 3);
        assert_eq!(backtest["prices"][2]["price"], json!(102.5));

        let plan = agent.agent().last_plan().unwrap();
        assert_eq!(plan.score, Some(10.0));
        assert_eq!(plan.price, 102.5);
        assert_eq!(plan.risk_status, Some(ApprovalStatus::Approved));

        let published = &calls_to(&log, PUBLISH)[0];
        assert_eq!(published["topic"], TOPIC);
        assert_eq!(published["payload"]["action"], "BUY");
        assert_eq!(published["payload"]["risk_status"], "APPROVED");
        assert_eq!(published["payload"]["plan_id"], "plan_demo");
    }

    #[tokio::test]
    async fn test_config_failure_uses_default_candidates() {
        let log = call_log();
        let config = failing_service(&log, "config", CONFIG_GET);
        let mut agent = agent_with(&log, config);
        agent.run(CancellationToken::new()).await.unwrap();

        let thresholds: Vec<f64> = agent
            .agent()
            .last_reports()
            .iter()
            .map(|r| r.threshold)
            .collect();
        assert_eq!(thresholds, DEFAULT_CANDIDATES.to_vec());
    }

    #[tokio::test]
    async fn test_non_list_candidates_use_default() {
        let log = call_log();
        let config = fake_service(&log, vec![(CONFIG_GET, json!({"value": null}))]);
        let mut agent = agent_with(&log, config);
        agent.run(CancellationToken::new()).await.unwrap();

        assert_eq!(agent.agent().last_reports().len(), 3);
    }
}
