//! Types for the Market Merger strategy

mod context;
mod state;
mod quote;

pub use context::MarketContext;
pub use state::{MarketState, BidInfo, SizingPhase};
pub use quote::{Quote, QuoteLadder, TakerOpportunity};
