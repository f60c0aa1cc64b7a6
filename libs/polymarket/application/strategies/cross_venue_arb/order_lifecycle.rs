//! The primary-side order's own sub-state-machine: place, poll, cancel.

use super::interfaces::{PlacedOrder, PrimaryVenueClient, VenueOrderStatus};
use super::types::TaskErrorKind;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Unplaced,
    Open,
    Cancelling,
    Cancelled,
    Filled,
}

pub struct OrderLifecycle {
    client: Arc<dyn PrimaryVenueClient>,
    state: OrderState,
    order_id: Option<String>,
}

impl OrderLifecycle {
    pub fn new(client: Arc<dyn PrimaryVenueClient>) -> Self {
        Self {
            client,
            state: OrderState::Unplaced,
            order_id: None,
        }
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub async fn place(
        &mut self,
        token_id: &str,
        price: f64,
        size: f64,
    ) -> Result<PlacedOrder, TaskErrorKind> {
        if self.state != OrderState::Unplaced {
            return Err(TaskErrorKind::InternalInvariant(
                "place called on a non-Unplaced order".into(),
            ));
        }

        let placed = self.client.place_limit(token_id, price, size).await?;
        info!("primary order placed: {}", placed.order_id);
        self.order_id = Some(placed.order_id.clone());
        self.state = OrderState::Open;
        Ok(placed)
    }

    pub async fn cancel(&mut self) -> Result<(), TaskErrorKind> {
        let order_id = match &self.order_id {
            Some(id) if self.state == OrderState::Open => id.clone(),
            _ => return Ok(()),
        };

        self.state = OrderState::Cancelling;
        match self.client.cancel(&order_id).await {
            Ok(()) => {
                self.state = OrderState::Cancelled;
                Ok(())
            }
            Err(err) => {
                warn!("cancel failed for {}: {:?}", order_id, err);
                // Leave state as Cancelling; the caller's timeout/poll
                // loop will retry or the fill aggregator will resolve it
                // via a late fill observation.
                Err(err)
            }
        }
    }

    pub fn mark_filled(&mut self) {
        self.state = OrderState::Filled;
    }

    /// Poll the venue for this order's current status. Used both for the
    /// periodic REST reconciliation pass and for the cancel-race check:
    /// a successful `cancel` ack is never treated as proof of zero fill,
    /// so the caller re-polls through here before deciding the task's
    /// final outcome (spec §4.7/§7).
    pub async fn poll_status(&self) -> Result<VenueOrderStatus, TaskErrorKind> {
        let order_id = self.order_id.as_deref().ok_or_else(|| {
            TaskErrorKind::InternalInvariant("poll_status called before an order was placed".into())
        })?;
        self.client.order_status(order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::cross_venue_arb::types::OrderBookSnapshot;
    use async_trait::async_trait;

    struct FakePrimaryClient;

    #[async_trait]
    impl PrimaryVenueClient for FakePrimaryClient {
        async fn place_limit(
            &self,
            token_id: &str,
            price: f64,
            size: f64,
        ) -> Result<PlacedOrder, TaskErrorKind> {
            Ok(PlacedOrder {
                order_id: "o1".into(),
                token_id: token_id.into(),
                price,
                size,
            })
        }

        async fn cancel(&self, _order_id: &str) -> Result<(), TaskErrorKind> {
            Ok(())
        }

        async fn order_status(&self, _order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind> {
            unimplemented!()
        }

        async fn order_book(&self, _token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn double_place_is_rejected() {
        let mut lifecycle = OrderLifecycle::new(Arc::new(FakePrimaryClient));
        lifecycle.place("tok", 0.45, 10.0).await.unwrap();
        let err = lifecycle.place("tok", 0.45, 10.0).await;
        assert!(matches!(err, Err(TaskErrorKind::InternalInvariant(_))));
    }

    #[tokio::test]
    async fn cancel_on_unplaced_order_is_a_no_op() {
        let mut lifecycle = OrderLifecycle::new(Arc::new(FakePrimaryClient));
        assert!(lifecycle.cancel().await.is_ok());
        assert_eq!(lifecycle.state(), OrderState::Unplaced);
    }
}
