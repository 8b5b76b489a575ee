//! Trend regime classification

use agent_sdk::{Agent, AgentContext, HostRouter, LocalClient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{FeatureRow, Regime, TrendState, SCHEMA_VERSION};
use tracing::{info, warn};

use super::DEFAULT_SYMBOL;
use crate::indicators::{momentum, regime};
use crate::tools::{self, OhlcvQuery, Service};

pub const TOPIC: &str = "trends.state";
pub const FEATURE_SET: &str = "trend_demo";

const MOMENTUM_LOOKBACK: usize = 3;
const REGIME_WINDOW: usize = 5;

/// Classifies the recent trend and publishes it as a [`TrendState`]
pub struct TrendAgent {
    market_data: Service,
    feature_store: Service,
    bus: Service,
    query: OhlcvQuery,
    last_state: Option<TrendState>,
}

impl TrendAgent {
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
            last_state: None,
        }
    }

    pub fn last_state(&self) -> Option<&TrendState> {
        self.last_state.as_ref()
    }
}

#[async_trait]
impl Agent for TrendAgent {
    type Client = LocalClient;

    async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        let ohlcv = tools::get_ohlcv(self.market_data.as_ref(), &self.query).await?;
        let closes = ohlcv.closes();
        let ts = ohlcv
            .last_ts()
            .with_context(|| format!("market-data returned no bars for {}", self.query.symbol))?;

        let mom = momentum(&closes, MOMENTUM_LOOKBACK);
        let reg = regime(&closes, REGIME_WINDOW).unwrap_or_else(|| {
            warn!(
                "Only {} bars for {}, treating regime as sideways",
                closes.len(),
                self.query.symbol
            );
            Regime::Sideways
        });

        let symbol = self.query.symbol.as_str();
        let rows = vec![
            FeatureRow::new(ts, symbol, FEATURE_SET, "momentum3", mom),
            FeatureRow::new(ts, symbol, FEATURE_SET, format!("regime_{}", reg.as_str()), 1.0),
        ];
        tools::write_features(self.feature_store.as_ref(), FEATURE_SET, rows).await?;

        let state = TrendState {
            symbol: symbol.to_string(),
            ts,
            regime: reg,
            macd: None,
            slope: Some(mom),
            strength: None,
            version: SCHEMA_VERSION.to_string(),
        };
        tools::publish(self.bus.as_ref(), TOPIC, &state).await?;

        info!("Trend for {}: {} (momentum {:.2})", symbol, reg.as_str(), mom);
        self.last_state = Some(state);
        ctx.stop();
        Ok(())
    }
}
