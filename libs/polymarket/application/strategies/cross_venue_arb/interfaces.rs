//! Capability interfaces the task execution engine depends on.
//!
//! The engine never talks to a concrete exchange client directly — it is
//! written entirely against these traits, mirroring how `Strategy` in
//! `application/strategies/traits.rs` is written against `StrategyContext`
//! rather than a concrete `TradingClient`. `venue_adapter.rs` supplies the
//! default implementations over the existing CLOB client; tests supply
//! in-memory fakes.

use super::types::{FillEvent, OrderBookSnapshot, TaskErrorKind};
use async_trait::async_trait;

/// A newly placed or queried order, venue-agnostic.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: String,
    pub token_id: String,
    pub price: f64,
    pub size: f64,
}

/// Status alphabet common to both venues' order lifecycles (spec §4.7):
/// `PENDING, OPEN, PARTIALLY_FILLED, FILLED, CANCELLED, EXPIRED, REJECTED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueOrderState {
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
    Rejected,
}

impl VenueOrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VenueOrderState::Filled
                | VenueOrderState::Cancelled
                | VenueOrderState::Expired
                | VenueOrderState::Rejected
        )
    }
}

/// Result of polling an order's status on either venue.
#[derive(Debug, Clone, Copy)]
pub struct VenueOrderStatus {
    pub state: VenueOrderState,
    pub filled_qty: f64,
    pub remaining_qty: f64,
}

/// The venue a primary-side order is placed and monitored on.
#[async_trait]
pub trait PrimaryVenueClient: Send + Sync {
    async fn place_limit(
        &self,
        token_id: &str,
        price: f64,
        size: f64,
    ) -> Result<PlacedOrder, TaskErrorKind>;

    async fn cancel(&self, order_id: &str) -> Result<(), TaskErrorKind>;

    /// Poll the current status of a previously placed order. The
    /// executor never treats a `cancel` ack alone as proof of zero
    /// fill — it re-polls through here and reconciles whatever it
    /// finds (cancel-race, spec §4.7/§7).
    async fn order_status(&self, order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind>;

    async fn order_book(&self, token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind>;
}

/// The reference venue a hedge order is placed on and whose book is
/// polled for cost validity.
#[async_trait]
pub trait HedgeVenueClient: Send + Sync {
    async fn place_market_like(
        &self,
        token_id: &str,
        max_price: f64,
        size: f64,
    ) -> Result<PlacedOrder, TaskErrorKind>;

    async fn order_status(&self, order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind>;

    async fn order_book(&self, token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind>;
}

/// One of the two independent fill-event sources: the venue's own wallet
/// WebSocket channel.
#[async_trait]
pub trait WalletEventStream: Send + Sync {
    async fn next_fill(&mut self) -> Option<FillEvent>;
}

/// The other independent fill-event source: on-chain logs for the
/// settlement contract.
#[async_trait]
pub trait ChainEventStream: Send + Sync {
    async fn next_fill(&mut self) -> Option<FillEvent>;
}

/// Order signing capability, kept separate from venue clients so a task
/// never needs direct key material.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign_order(&self, payload: &[u8]) -> Result<Vec<u8>, TaskErrorKind>;
}
