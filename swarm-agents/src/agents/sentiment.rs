//! Headline sentiment scoring

use agent_sdk::{Agent, AgentContext, HostRouter, LocalClient, McpClient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use common::{FeatureRow, SentimentIndex};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::tools::{self, Service, SCORE_TEXTS};

pub const TOPIC: &str = "sentiment_data_stream";
pub const FEATURE_SET: &str = "sentiment_demo";
const PROVIDER: &str = "stub";

/// Text submitted for scoring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextItem {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextScore {
    pub id: String,
    pub score: f64,
    #[serde(default)]
    pub magnitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreTextsResponse {
    #[serde(default)]
    pub scores: Vec<TextScore>,
}

impl ScoreTextsResponse {
    /// Mean score, 0.0 when nothing was scored
    pub fn average(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().map(|s| s.score).sum::<f64>() / self.scores.len() as f64
    }
}

/// Scores headlines for one symbol and publishes the average as a [`SentimentIndex`]
pub struct SentimentAgent {
    nlp: Service,
    feature_store: Service,
    bus: Service,
    symbol: String,
    as_of: DateTime<Utc>,
    items: Vec<TextItem>,
    last_index: Option<SentimentIndex>,
}

impl SentimentAgent {
    pub fn new(router: &HostRouter) -> Self {
        Self::with_services(
            tools::service(router, "nlp-sentiment"),
            tools::service(router, "feature-store"),
            tools::service(router, "bus"),
        )
    }

    pub fn with_services(nlp: Service, feature_store: Service, bus: Service) -> Self {
        let items = [
            ("n1", "NVDA upgraded by analyst, strong outlook"),
            ("n2", "CEO resigns unexpectedly, guidance cut"),
        ]
        .into_iter()
        .map(|(id, text)| TextItem {
            id: id.to_string(),
            text: text.to_string(),
        })
        .collect();

        Self {
            nlp,
            feature_store,
            bus,
            symbol: "NVDA".to_string(),
            as_of: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).single().unwrap_or_default(),
            items,
            last_index: None,
        }
    }

    pub fn last_index(&self) -> Option<&SentimentIndex> {
        self.last_index.as_ref()
    }

    async fn score(&self) -> Result<ScoreTextsResponse> {
        let payload = json!({ "provider": PROVIDER, "items": self.items });
        let value = self.nlp.call(SCORE_TEXTS, payload).await?;
        serde_json::from_value(value).with_context(|| format!("decoding {} response", SCORE_TEXTS))
    }
}

#[async_trait]
impl Agent for SentimentAgent {
    type Client = LocalClient;

    async fn tick(&mut self, ctx: &mut AgentContext<LocalClient>) -> Result<()> {
        let scored = self.score().await?;
        let avg = scored.average();

        let row = FeatureRow::new(self.as_of, &self.symbol, FEATURE_SET, "avg_stub", avg);
        let index = SentimentIndex::new(
            &self.symbol,
            self.as_of,
            avg,
            1.0,
            Some(vec![PROVIDER.to_string()]),
        )?;

        tools::write_features(self.feature_store.as_ref(), FEATURE_SET, vec![row]).await?;
        tools::publish(self.bus.as_ref(), TOPIC, &index).await?;

        info!(
            "Sentiment for {}: {:.3} over {} texts",
            self.symbol,
            avg,
            scored.scores.len()
        );
        self.last_index = Some(index);
        ctx.stop();
        Ok(())
    }
}
