//! Configuration for the Market Merger strategy
//!
//! Re-exports configuration from infrastructure to follow the established pattern.

pub use crate::infrastructure::config::MarketMergerConfig;
