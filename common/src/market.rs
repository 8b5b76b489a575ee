//! Market-data and feature-store payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schemas::default_version;

/// One OHLCV bar as returned by `market-data.get_ohlcv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub ts: DateTime<Utc>,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Response body of `market-data.get_ohlcv`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OhlcvResponse {
    pub rows: Vec<OhlcvBar>,
}

impl OhlcvResponse {
    /// Closing prices in bar order
    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    /// Timestamp of the most recent bar
    pub fn last_ts(&self) -> Option<DateTime<Utc>> {
        self.rows.last().map(|r| r.ts)
    }
}

/// A single feature value written to the feature store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub feature_set: String,
    pub feature_name: String,
    pub value: f64,
    #[serde(default = "default_version")]
    pub ver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl FeatureRow {
    pub fn new(
        ts: DateTime<Utc>,
        symbol: impl Into<String>,
        feature_set: impl Into<String>,
        feature_name: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            ts,
            symbol: symbol.into(),
            feature_set: feature_set.into(),
            feature_name: feature_name.into(),
            value,
            ver: default_version(),
            source: None,
        }
    }
}

/// Request body of `feature-store.write_features`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFeaturesRequest {
    pub feature_set: String,
    pub rows: Vec<FeatureRow>,
}
