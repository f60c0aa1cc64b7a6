//! Order book snapshot types shared by both venues.

use crate::infrastructure::client::clob::PriceLevel;
use std::time::Instant;

/// A cached snapshot of one side-pair of a venue's order book for a token.
#[derive(Debug, Clone)]
pub struct OrderBookSnapshot {
    pub token_id: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub fetched_at: Instant,
}

impl OrderBookSnapshot {
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price_f64())
    }

    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price_f64())
    }

    pub fn age(&self) -> std::time::Duration {
        self.fetched_at.elapsed()
    }
}

/// Freshness classification used by `OrderBookCache` reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
    Expired,
}
