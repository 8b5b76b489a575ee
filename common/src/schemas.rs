//! Swarm message schemas published on the bus

use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Version tag stamped on every schema unless the producer overrides it
pub const SCHEMA_VERSION: &str = "v1";

pub(crate) fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_confidence() -> f64 {
    1.0
}

/// Envelope metadata shared by bus messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
}

/// Composite strategy score in [-1, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalScore {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub strategy: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<HashMap<String, f64>>,
    #[serde(default = "default_version")]
    pub version: String,
}

/// Aggregated news sentiment for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentIndex {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub polarity: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(default = "default_version")]
    pub version: String,
}

impl SentimentIndex {
    /// Build a sentiment index, rejecting out-of-range polarity or confidence
    pub fn new(
        symbol: impl Into<String>,
        ts: DateTime<Utc>,
        polarity: f64,
        confidence: f64,
        sources: Option<Vec<String>>,
    ) -> Result<Self> {
        let index = Self {
            symbol: symbol.into(),
            ts,
            polarity,
            confidence,
            sources,
            version: default_version(),
        };
        index.validate()?;
        Ok(index)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (-1.0..=1.0).contains(&self.polarity),
            "polarity must be between -1 and 1, got {}",
            self.polarity
        );
        ensure!(
            (0.0..=1.0).contains(&self.confidence),
            "confidence must be between 0 and 1, got {}",
            self.confidence
        );
        Ok(())
    }
}

/// Trend regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regime {
    Up,
    Down,
    Sideways,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Up => "UP",
            Regime::Down => "DOWN",
            Regime::Sideways => "SIDEWAYS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendState {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub regime: Regime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default = "default_version")]
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Draft trade produced by the strategy builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub plan_id: String,
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub action: TradeAction,
    pub qty: f64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_status: Option<ApprovalStatus>,
    #[serde(default = "default_version")]
    pub version: String,
}

/// Pre-trade risk decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Approved,
    Adjusted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedTrade {
    pub approval_id: String,
    pub ts: DateTime<Utc>,
    pub plan_id: String,
    pub status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
}
