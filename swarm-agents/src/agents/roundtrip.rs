//! Market data to feature store copy

use agent_sdk::{Agent, AgentContext, HostRouter, LocalClient};
use anyhow::Result;
use async_trait::async_trait;
use common::FeatureRow;
use tracing::info;

use super::DEFAULT_SYMBOL;
use crate::tools::{self, OhlcvQuery, Service};

pub const FEATURE_SET: &str = "demo";

/// Copies closing prices from market data into the feature store
pub struct RoundtripAgent {
    market_data: Service,
    feature_store: Service,
    query: OhlcvQuery,
    wrote: Option<u64>,
}

impl RoundtripAgent {
    pub fn new(router: &HostRouter) -> Self {
        Self::with_services(
            tools::service(router, "market-data"),
            tools::service(router, "feature-store"),
        )
    }

    pub fn with_services(market_data: Service, feature_store: Service) -> Self {
        Self {
            market_data,
            feature_store,
            query: OhlcvQuery::daily(DEFAULT_SYMBOL, "2024-01-01", "2024-01-03"),
            wrote: None,
        }
    }

    /// Row count the feature store reported for the last tick
    pub fn wrote(&self) -> Option<u64> {
        self.wrote
    }
}

#[async_trait]
impl Agent for RoundtripAgent {
    type Client = LocalClient;

    async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        let ohlcv = tools::get_ohlcv(self.market_data.as_ref(), &self.query).await?;

        let rows = ohlcv
            .rows
            .iter()
            .map(|bar| FeatureRow::new(bar.ts, &self.query.symbol, FEATURE_SET, "close", bar.close))
            .collect();
        let wrote = tools::write_features(self.feature_store.as_ref(), FEATURE_SET, rows).await?;

        info!("Roundtrip wrote {} feature rows", wrote);
        self.wrote = Some(wrote);
        ctx.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{call_log, calls_to, fake_service, ohlcv_rows, tools_called};
    use crate::tools::{GET_OHLCV, WRITE_FEATURES};
    use agent_sdk::{AgentConfig, BaseAgent, CancellationToken};
    use serde_json::json;

    #[tokio::test]
    async fn test_closes_written_as_features() {
        let log = call_log();
        let md = fake_service(&log, vec![(GET_OHLCV, ohlcv_rows(&[100.0, 101.5, 99.0]))]);
        let fs = fake_service(&log, vec![(WRITE_FEATURES, json!({"wrote": 3}))]);

        let config = AgentConfig::new("roundtrip-agent").unwrap();
        let mut agent = BaseAgent::new(
            config,
            LocalClient::new(),
            RoundtripAgent::with_services(md, fs),
        );
        agent.run(CancellationToken::new()).await.unwrap();

        assert_eq!(agent.agent().wrote(), Some(3));
        assert_eq!(tools_called(&log), vec![GET_OHLCV, WRITE_FEATURES]);

        let write = &calls_to(&log, WRITE_FEATURES)[0];
        assert_eq!(write["feature_set"], "demo");
        let values: Vec<f64> = write["rows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["value"].as_f64().unwrap())
            .collect();
        assert_eq!(values, vec![100.0, 101.5, 99.0]);
        assert_eq!(write["rows"][0]["feature_name"], "close");
        assert_eq!(write["rows"][0]["symbol"], "AAPL");
    }

    #[tokio::test]
    async fn test_empty_series_writes_empty_set() {
        let log = call_log();
        let md = fake_service(&log, vec![(GET_OHLCV, json!({"rows": []}))]);
        let fs = fake_service(&log, vec![(WRITE_FEATURES, json!({"wrote": 0}))]);

        let mut agent = BaseAgent::new(
            AgentConfig::new("roundtrip-agent").unwrap(),
            LocalClient::new(),
            RoundtripAgent::with_services(md, fs),
        );
        agent.run(CancellationToken::new()).await.unwrap();

        assert_eq!(agent.agent().wrote(), Some(0));
        let write = &calls_to(&log, WRITE_FEATURES)[0];
        assert_eq!(write["rows"], json!([]));
    }
}
