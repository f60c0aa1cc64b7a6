//! Default `PrimaryVenueClient`/`HedgeVenueClient` implementations over
//! the existing CLOB `TradingClient`.
//!
//! Both traits are implemented by the same adapter type, parameterized
//! only by which token/venue it was built for — the primary and hedge
//! venues have the same order shape (spec treats P and H symmetrically),
//! so there is no need for two distinct client types.

use super::interfaces::{HedgeVenueClient, PlacedOrder, PrimaryVenueClient, VenueOrderState, VenueOrderStatus};
use super::types::{OrderBookSnapshot, TaskErrorKind};
use crate::infrastructure::client::clob::{OrderType, Side, TradingClient};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

pub struct TradingClientAdapter {
    client: Arc<TradingClient>,
}

impl TradingClientAdapter {
    pub fn new(client: Arc<TradingClient>) -> Self {
        Self { client }
    }

    fn classify_error(err: impl std::fmt::Display) -> TaskErrorKind {
        let msg = err.to_string();
        if msg.contains("timed out") || msg.contains("connection") || msg.contains("network") {
            TaskErrorKind::TransientNet(msg)
        } else {
            TaskErrorKind::PermanentVenue(msg)
        }
    }

    /// Parse a CLOB `GET /order/{id}` response (an untyped JSON value —
    /// the field shape is the same one `ActiveOrder::from_json` and
    /// `OrderState::from_order_json` already decode) into the
    /// venue-agnostic status shape the task engine consumes.
    async fn fetch_order_status(&self, order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind> {
        let order = self.client.get_order(order_id).await.map_err(Self::classify_error)?;

        let parse_f64 = |v: Option<&serde_json::Value>| -> f64 {
            v.and_then(|v| v.as_str().and_then(|s| s.parse().ok()).or_else(|| v.as_f64()))
                .unwrap_or(0.0)
        };

        let original_size = parse_f64(order.get("original_size"));
        let size_matched = parse_f64(order.get("size_matched"));
        let status_str = order.get("status").and_then(|v| v.as_str()).unwrap_or("");

        let state = match status_str.to_uppercase().as_str() {
            "LIVE" | "OPEN" => {
                if size_matched > 0.0 {
                    VenueOrderState::PartiallyFilled
                } else {
                    VenueOrderState::Open
                }
            }
            "MATCHED" | "FILLED" => VenueOrderState::Filled,
            "CANCELLED" | "CANCELED" => VenueOrderState::Cancelled,
            "EXPIRED" => VenueOrderState::Expired,
            "REJECTED" | "UNMATCHED" => VenueOrderState::Rejected,
            _ if size_matched >= original_size && original_size > 0.0 => VenueOrderState::Filled,
            _ if size_matched > 0.0 => VenueOrderState::PartiallyFilled,
            _ => VenueOrderState::Open,
        };

        Ok(VenueOrderStatus {
            state,
            filled_qty: size_matched,
            remaining_qty: (original_size - size_matched).max(0.0),
        })
    }
}

#[async_trait]
impl PrimaryVenueClient for TradingClientAdapter {
    async fn place_limit(
        &self,
        token_id: &str,
        price: f64,
        size: f64,
    ) -> Result<PlacedOrder, TaskErrorKind> {
        let response = self
            .client
            .buy(token_id, price, size)
            .await
            .map_err(Self::classify_error)?;

        let order_id = response
            .order_id
            .ok_or_else(|| TaskErrorKind::PermanentVenue("order placed without an id".into()))?;

        Ok(PlacedOrder {
            order_id,
            token_id: token_id.to_string(),
            price,
            size,
        })
    }

    async fn cancel(&self, order_id: &str) -> Result<(), TaskErrorKind> {
        self.client
            .cancel_order(order_id)
            .await
            .map(|_| ())
            .map_err(Self::classify_error)
    }

    async fn order_status(&self, order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind> {
        self.fetch_order_status(order_id).await
    }

    async fn order_book(&self, token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
        let book = self
            .client
            .rest()
            .get_orderbook(token_id)
            .await
            .map_err(Self::classify_error)?;

        Ok(OrderBookSnapshot {
            token_id: token_id.to_string(),
            bids: book.bids,
            asks: book.asks,
            fetched_at: Instant::now(),
        })
    }
}

#[async_trait]
impl HedgeVenueClient for TradingClientAdapter {
    async fn place_market_like(
        &self,
        token_id: &str,
        max_price: f64,
        size: f64,
    ) -> Result<PlacedOrder, TaskErrorKind> {
        // FAK (fill-and-kill) rather than FOK: the hedge procedure
        // (spec §4.6) is explicitly written to handle a partial fill by
        // retrying the remainder, which an all-or-nothing FOK order
        // could never produce.
        let response = self
            .client
            .place_order(token_id, max_price, size, Side::Buy, OrderType::FAK)
            .await
            .map_err(Self::classify_error)?;

        let order_id = response
            .order_id
            .ok_or(TaskErrorKind::HedgePriceRejected)?;

        Ok(PlacedOrder {
            order_id,
            token_id: token_id.to_string(),
            price: max_price,
            size,
        })
    }

    async fn order_status(&self, order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind> {
        self.fetch_order_status(order_id).await
    }

    async fn order_book(&self, token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
        PrimaryVenueClient::order_book(self, token_id).await
    }
}
