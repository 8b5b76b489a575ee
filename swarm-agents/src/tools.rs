//! Typed wrappers over the host router tools the agents share

use agent_sdk::{HostRouter, McpClient};
use anyhow::{Context, Result};
use common::{FeatureRow, OhlcvResponse, WriteFeaturesRequest};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub const GET_OHLCV: &str = "market-data.get_ohlcv";
pub const WRITE_FEATURES: &str = "feature-store.write_features";
pub const PUBLISH: &str = "bus.publish";
pub const CONFIG_GET: &str = "config.get";
pub const BACKTEST_RUN: &str = "backtester.run";
pub const PRETRADE_CHECK: &str = "risk-engine.pretrade_check";
pub const SUBMIT_ORDER: &str = "broker-gateway.submit_order";
pub const GET_POSITIONS: &str = "broker-gateway.get_positions";
pub const GET_FILLS: &str = "broker-gateway.get_fills";
pub const SCORE_TEXTS: &str = "nlp-sentiment.score_texts";
pub const WRITE_EXEC_STAT: &str = "analytics.write_exec_stat";

/// A client bound to one remote service, shareable across ticks
pub type Service = Arc<dyn McpClient>;

pub fn service(router: &HostRouter, name: &str) -> Service {
    Arc::new(router.service(name))
}

/// Request body of `market-data.get_ohlcv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcvQuery {
    pub symbol: String,
    pub start: String,
    pub end: String,
    pub interval: String,
}

impl OhlcvQuery {
    pub fn daily(symbol: &str, start: &str, end: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            interval: "1d".to_string(),
        }
    }
}

/// Fetch bars for `query`. The series may be empty; agents that need the
/// latest bar check for that themselves.
pub async fn get_ohlcv(client: &dyn McpClient, query: &OhlcvQuery) -> Result<OhlcvResponse> {
    let value = client.call(GET_OHLCV, serde_json::to_value(query)?).await?;
    let response: OhlcvResponse =
        serde_json::from_value(value).with_context(|| format!("decoding {} response", GET_OHLCV))?;
    debug!("Fetched {} bars for {}", response.rows.len(), query.symbol);
    Ok(response)
}

/// Write `rows` under `feature_set`; returns the store's `wrote` count
pub async fn write_features(
    client: &dyn McpClient,
    feature_set: &str,
    rows: Vec<FeatureRow>,
) -> Result<u64> {
    let request = WriteFeaturesRequest {
        feature_set: feature_set.to_string(),
        rows,
    };
    let response = client
        .call(WRITE_FEATURES, serde_json::to_value(&request)?)
        .await?;
    Ok(response.get("wrote").and_then(Value::as_u64).unwrap_or(0))
}

/// Publish `payload` on the bus under `topic`
pub async fn publish<T: Serialize>(client: &dyn McpClient, topic: &str, payload: &T) -> Result<Value> {
    let body = json!({
        "topic": topic,
        "payload": serde_json::to_value(payload)?,
    });
    client.call(PUBLISH, body).await
}
