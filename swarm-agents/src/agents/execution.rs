//! Order submission, fills and execution-quality stats

use agent_sdk::{Agent, AgentContext, CallPolicy, HostRouter, LocalClient, McpClientExt};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use common::{FeatureRow, OhlcvBar, TradeAction};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::DEFAULT_SYMBOL;
use crate::tools::{self, OhlcvQuery, Service, WRITE_EXEC_STAT};

pub const FEATURE_SET: &str = "orders_sim";
pub const DEFAULT_THRESHOLD: f64 = 0.2;

/// Simulated one-unit order
#[derive(Debug, Clone, PartialEq)]
pub struct SimOrder {
    pub ts: DateTime<Utc>,
    pub side: TradeAction,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Simulation {
    pub orders: Vec<SimOrder>,
    /// Cash plus the open position marked at the last price, rounded to cents
    pub pnl: f64,
}

/// Buy one unit when a bar rises more than `threshold` over the previous
/// close; sell one held unit when it falls more than `threshold`.
pub fn simulate_threshold(bars: &[OhlcvBar], threshold: f64) -> Simulation {
    let Some(first) = bars.first() else {
        return Simulation::default();
    };

    let mut last = first.close;
    let mut cash = 0.0;
    let mut position: u32 = 0;
    let mut orders = Vec::new();

    for bar in bars {
        let delta = bar.close - last;
        if delta > threshold {
            orders.push(SimOrder {
                ts: bar.ts,
                side: TradeAction::Buy,
                price: bar.close,
            });
            position += 1;
            cash -= bar.close;
        } else if delta < -threshold && position > 0 {
            orders.push(SimOrder {
                ts: bar.ts,
                side: TradeAction::Sell,
                price: bar.close,
            });
            position -= 1;
            cash += bar.close;
        }
        last = bar.close;
    }

    cash += f64::from(position) * last;
    Simulation {
        orders,
        pnl: (cash * 100.0).round() / 100.0,
    }
}

/// Replays a threshold strategy over recent bars, stores the simulated
/// orders, and reports an execution stat to analytics
pub struct ExecutionAgent {
    market_data: Service,
    feature_store: Service,
    analytics: Service,
    threshold: f64,
    analytics_policy: CallPolicy,
    correlation_id: String,
    query: OhlcvQuery,
    last_simulation: Option<Simulation>,
}

impl ExecutionAgent {
    /// Correlation id is the configured trace id, or a fresh one per process
    pub fn new(router: &HostRouter, threshold: f64) -> Self {
        let correlation_id = router
            .config()
            .identity
            .trace_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self::with_services(
            tools::service(router, "market-data"),
            tools::service(router, "feature-store"),
            tools::service(router, "analytics"),
            threshold,
            correlation_id,
        )
    }

    pub fn with_services(
        market_data: Service,
        feature_store: Service,
        analytics: Service,
        threshold: f64,
        correlation_id: String,
    ) -> Self {
        Self {
            market_data,
            feature_store,
            analytics,
            threshold,
            analytics_policy: CallPolicy::BestEffort,
            correlation_id,
            query: OhlcvQuery::daily(DEFAULT_SYMBOL, "2024-01-01", "2024-01-10"),
            last_simulation: None,
        }
    }

    /// How failures of the analytics write are treated
    pub fn with_analytics_policy(mut self, policy: CallPolicy) -> Self {
        self.analytics_policy = policy;
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn last_simulation(&self) -> Option<&Simulation> {
        self.last_simulation.as_ref()
    }
}

#[async_trait]
impl Agent for ExecutionAgent {
    type Client = LocalClient;

    async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        let ohlcv = tools::get_ohlcv(self.market_data.as_ref(), &self.query).await?;
        let sim = simulate_threshold(&ohlcv.rows, self.threshold);

        let symbol = self.query.symbol.as_str();
        let rows: Vec<FeatureRow> = sim
            .orders
            .iter()
            .map(|o| {
                let side = match o.side {
                    TradeAction::Buy => "buy",
                    TradeAction::Sell => "sell",
                };
                FeatureRow::new(o.ts, symbol, FEATURE_SET, side, o.price)
            })
            .collect();

        let stat_ts = rows
            .last()
            .map(|r| r.ts)
            .or_else(|| Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).single())
            .unwrap_or_default();

        if !rows.is_empty() {
            tools::write_features(self.feature_store.as_ref(), FEATURE_SET, rows).await?;
        }

        let stat = json!({
            "ts": stat_ts,
            "symbol": symbol,
            "orders_count": sim.orders.len(),
            "pnl": sim.pnl,
            "trace_id": self.correlation_id,
        });
        self.analytics
            .call_with(self.analytics_policy, WRITE_EXEC_STAT, stat)
            .await?;

        info!(
            "Simulated {} orders for {}, pnl {:.2}",
            sim.orders.len(),
            symbol,
            sim.pnl
        );
        self.last_simulation = Some(sim);
        ctx.stop();
        Ok(())
    }
}
