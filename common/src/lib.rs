//! Shared payload types exchanged between agents and host-router services.
//!
//! These are structural types only: services own the authoritative schemas,
//! agents use these to build requests and read responses.

pub mod market;
pub mod schemas;

pub use market::{FeatureRow, OhlcvBar, OhlcvResponse, WriteFeaturesRequest};
pub use schemas::{
    ApprovalStatus, ApprovedTrade, Message, Regime, SentimentIndex, SignalScore, TradeAction,
    TradePlan, TrendState, SCHEMA_VERSION,
};
