//! RSI/SMA composite signal

use agent_sdk::{Agent, AgentContext, HostRouter, LocalClient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{FeatureRow, SignalScore, SCHEMA_VERSION};
use std::collections::HashMap;
use tracing::info;

use super::DEFAULT_SYMBOL;
use crate::indicators::{composite_score, rsi, sma};
use crate::tools::{self, OhlcvQuery, Service};

pub const STRATEGY: &str = "rsi_sma_combo";
pub const TOPIC: &str = "signals.rsi_sma";
pub const FEATURE_SET: &str = "signals_demo";

/// Scores the latest bars with RSI(5) and an SMA(5)/SMA(10) slope, then
/// publishes the score and stores it as features
pub struct SignalAgent {
    market_data: Service,
    feature_store: Service,
    bus: Service,
    query: OhlcvQuery,
    last_signal: Option<SignalScore>,
}

impl SignalAgent {
    pub fn new(router: &HostRouter) -> Self {
        Self::with_services(
            tools::service(router, "market-data"),
            tools::service(router, "feature-store"),
            tools::service(router, "bus"),
        )
    }

    pub fn with_services(market_data: Service, feature_store: Service, bus: Service) -> Self {
        Self {
            market_data,
            feature_store,
            bus,
            query: OhlcvQuery::daily(DEFAULT_SYMBOL, "2024-01-01", "2024-01-15"),
            last_signal: None,
        }
    }

    pub fn last_signal(&self) -> Option<&SignalScore> {
        self.last_signal.as_ref()
    }
}

#[async_trait]
impl Agent for SignalAgent {
    type Client = LocalClient;

    async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        let ohlcv = tools::get_ohlcv(self.market_data.as_ref(), &self.query).await?;
        let closes = ohlcv.closes();
        let ts = ohlcv
            .last_ts()
            .with_context(|| format!("market-data returned no bars for {}", self.query.symbol))?;
        let last_close = closes.last().copied().unwrap_or_default();

        let rsi5 = rsi(&closes, 5);
        let sma5 = sma(&closes, 5);
        let sma10 = sma(&closes, 10);
        let score = composite_score(rsi5, sma5, sma10, last_close);

        let signal = SignalScore {
            symbol: self.query.symbol.clone(),
            ts,
            strategy: STRATEGY.to_string(),
            score,
            features: Some(HashMap::from([
                ("rsi5".to_string(), rsi5),
                ("sma5".to_string(), sma5),
                ("sma10".to_string(), sma10),
            ])),
            version: SCHEMA_VERSION.to_string(),
        };
        tools::publish(self.bus.as_ref(), TOPIC, &signal).await?;

        let rows = vec![
            FeatureRow::new(ts, &signal.symbol, FEATURE_SET, "rsi5", rsi5),
            FeatureRow::new(ts, &signal.symbol, FEATURE_SET, "score", score),
        ];
        tools::write_features(self.feature_store.as_ref(), FEATURE_SET, rows).await?;

        info!(
            "Signal {} for {}: score {:.3} (rsi5 {:.1})",
            STRATEGY, signal.symbol, score, rsi5
        );
        self.last_signal = Some(signal);
        ctx.stop();
        Ok(())
    }
}
