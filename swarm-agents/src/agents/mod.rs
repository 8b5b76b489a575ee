//! Concrete agents
//!
//! Apart from the heartbeat agent, every agent here is batch style: one tick
//! that calls the host router's services, then it stops itself.

pub mod execution;
pub mod heartbeat;
pub mod risk;
pub mod roundtrip;
pub mod sentiment;
pub mod signal;
pub mod strategy;
pub mod trend;

pub use execution::ExecutionAgent;
pub use heartbeat::HeartbeatAgent;
pub use risk::RiskAgent;
pub use roundtrip::RoundtripAgent;
pub use sentiment::SentimentAgent;
pub use signal::SignalAgent;
pub use strategy::StrategyBuilderAgent;
pub use trend::TrendAgent;

/// Symbol the demo agents trade and score
pub const DEFAULT_SYMBOL: &str = "AAPL";
