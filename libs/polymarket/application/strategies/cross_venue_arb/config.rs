//! Configuration surface for the cross-venue arbitrage strategy.
//!
//! Mirrors `BotConfig`/`SniperConfig` in `infrastructure/config/mod.rs`:
//! loaded from YAML with `#[serde(default)]` field defaults, validated
//! once at load time rather than scattered through the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrossVenueArbConfigError {
    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, CrossVenueArbConfigError>;

/// Exactly the options table from the external-interfaces section of the
/// specification this engine implements — no more, no fewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossVenueArbConfig {
    pub order_timeout_ms: u64,
    pub max_hedge_retries: u32,
    pub min_hedge_notional: f64,
    pub cost_poll_interval_ms: u64,
    pub rest_reconcile_ms: u64,
    pub book_cache_ttl_ms: u64,
    pub book_cache_stale_ms: u64,
    pub fee_rate_bps: u32,
    pub tick_primary: f64,
    pub tick_hedge: f64,
}

impl Default for CrossVenueArbConfig {
    fn default() -> Self {
        Self {
            order_timeout_ms: 10_000,
            max_hedge_retries: 3,
            min_hedge_notional: 1.0,
            cost_poll_interval_ms: 1_000,
            rest_reconcile_ms: 5_000,
            book_cache_ttl_ms: 500,
            book_cache_stale_ms: 2_000,
            fee_rate_bps: 90,
            tick_primary: 0.01,
            tick_hedge: 0.01,
        }
    }
}

impl CrossVenueArbConfig {
    pub fn load(config_path: impl AsRef<std::path::Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(config_path)
            .map_err(|e| CrossVenueArbConfigError::Validation(e.to_string()))?;
        let config: Self = serde_yaml::from_str(&yaml)
            .map_err(|e| CrossVenueArbConfigError::Validation(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.order_timeout_ms == 0 {
            return Err(CrossVenueArbConfigError::Validation(
                "order_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.min_hedge_notional <= 0.0 {
            return Err(CrossVenueArbConfigError::Validation(
                "min_hedge_notional must be positive".into(),
            ));
        }
        if self.book_cache_ttl_ms >= self.book_cache_stale_ms {
            return Err(CrossVenueArbConfigError::Validation(
                "book_cache_ttl_ms (freshness window) must be less than book_cache_stale_ms (hard-expire window)".into(),
            ));
        }
        if self.tick_primary <= 0.0 || self.tick_hedge <= 0.0 {
            return Err(CrossVenueArbConfigError::Validation(
                "tick sizes must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CrossVenueArbConfig::default().validate().is_ok());
    }

    #[test]
    fn ttl_must_be_tighter_than_stale_threshold() {
        let mut config = CrossVenueArbConfig::default();
        config.book_cache_ttl_ms = config.book_cache_stale_ms;
        assert!(config.validate().is_err());
    }

    #[test]
    fn min_hedge_notional_is_required_to_be_positive() {
        let mut config = CrossVenueArbConfig::default();
        config.min_hedge_notional = 0.0;
        assert!(config.validate().is_err());
    }
}
