//! Thin `Strategy` wrapper around the task execution engine.
//!
//! Opportunity detection (deciding *when* P and H diverge enough to act)
//! is out of scope here, the same way market discovery is out of scope
//! for `InventoryMMStrategy` — this type only owns the registry and
//! keeps it alive until shutdown, exactly as
//! `InventoryMMStrategy::start` loops on `ctx.is_running()` around its
//! own `tick`.
//!
//! It is, however, the one place `CrossVenueArbConfig` actually turns
//! into the parameters a `TaskExecutor` runs with — `submit` is the
//! seam an (out-of-scope) opportunity scanner calls into.

use super::config::CrossVenueArbConfig;
use super::interfaces::{ChainEventStream, HedgeVenueClient, PrimaryVenueClient, WalletEventStream};
use super::orderbook_cache::OrderBookCache;
use super::price_utils;
use super::task_executor::TaskExecutorDeps;
use super::task_registry::TaskRegistry;
use super::types::{CostState, TaskErrorKind, TaskParams};
use crate::application::strategies::traits::{Strategy, StrategyContext, StrategyResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A validated candidate trade handed in by the (out-of-scope) opportunity
/// scanner: a price/quantity pair already observed to be profitable on
/// both venues.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub idempotency_key: String,
    pub token_id_primary: String,
    pub token_id_hedge: String,
    pub quantity: f64,
    pub ask_primary: f64,
    pub ask_hedge: f64,
    /// The profitability ceiling the scanner sized this opportunity
    /// against — independent of the instantaneous `total_cost` the two
    /// asks imply, since the scanner is expected to require some margin
    /// below `maxCost` before surfacing an opportunity at all.
    pub max_cost: f64,
}

pub struct CrossVenueArbStrategy {
    config: CrossVenueArbConfig,
    registry: Arc<TaskRegistry>,
    book_cache: Arc<OrderBookCache>,
}

impl CrossVenueArbStrategy {
    pub fn new(config: CrossVenueArbConfig) -> Self {
        let book_cache = Arc::new(OrderBookCache::new(config.book_cache_ttl_ms, config.book_cache_stale_ms));
        Self {
            config,
            registry: Arc::new(TaskRegistry::new()),
            book_cache,
        }
    }

    pub fn config(&self) -> &CrossVenueArbConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<TaskRegistry> {
        self.registry.clone()
    }

    /// Validate `opportunity` against the venue price domain, derive its
    /// static `maxAskH` bound (§4.1), build the task's immutable
    /// parameters from `self.config`, and hand both to the registry —
    /// idempotent on `opportunity.idempotency_key` (P8).
    pub fn submit(
        &self,
        opportunity: Opportunity,
        primary: Arc<dyn PrimaryVenueClient>,
        hedge: Arc<dyn HedgeVenueClient>,
        wallet_stream: Box<dyn WalletEventStream>,
        chain_stream: Box<dyn ChainEventStream>,
    ) -> Result<String, TaskErrorKind> {
        if !price_utils::is_valid_price(opportunity.ask_primary)
            || !price_utils::is_valid_price(opportunity.ask_hedge)
        {
            return Err(TaskErrorKind::InvalidParams(format!(
                "prices out of [0.01, 0.99]: askP={}, askH={}",
                opportunity.ask_primary, opportunity.ask_hedge
            )));
        }
        if opportunity.quantity < 1.0 {
            return Err(TaskErrorKind::InvalidParams(format!(
                "quantity must be >= 1, got {}",
                opportunity.quantity
            )));
        }

        let total_cost = price_utils::total_cost(
            opportunity.ask_primary,
            opportunity.ask_hedge,
            self.config.fee_rate_bps,
        );
        let max_cost = opportunity.max_cost;
        if !price_utils::is_cost_valid(total_cost, max_cost) {
            return Err(TaskErrorKind::InvalidParams(format!(
                "opportunity total_cost {} already exceeds max_cost {}",
                total_cost, max_cost
            )));
        }
        let max_ask_h = price_utils::max_hedge_ask(opportunity.ask_primary, max_cost, self.config.fee_rate_bps)
            .ok_or_else(|| {
                TaskErrorKind::InvalidParams(
                    "primary-side fee already consumes the entire cost budget".into(),
                )
            })?;

        let cost = CostState {
            max_cost,
            max_ask_h,
            total_cost,
            fee_rate_bps: self.config.fee_rate_bps,
        };

        let params = TaskParams {
            idempotency_key: opportunity.idempotency_key,
            token_id_primary: opportunity.token_id_primary,
            token_id_hedge: opportunity.token_id_hedge,
            quantity: opportunity.quantity,
            ask_primary: opportunity.ask_primary,
            ask_hedge: opportunity.ask_hedge,
            max_cost,
            order_timeout_ms: self.config.order_timeout_ms,
            max_hedge_retries: self.config.max_hedge_retries,
            min_hedge_notional: self.config.min_hedge_notional,
            fee_rate_bps: self.config.fee_rate_bps,
            tick_hedge: self.config.tick_hedge,
        };

        let deps = TaskExecutorDeps {
            primary,
            hedge,
            wallet_stream,
            chain_stream,
            book_cache: self.book_cache.clone(),
            cost_poll_interval_ms: self.config.cost_poll_interval_ms,
            rest_reconcile_ms: self.config.rest_reconcile_ms,
            decimals: 18,
        };

        Ok(self.registry.create(params, cost, deps))
    }
}

#[async_trait]
impl Strategy for CrossVenueArbStrategy {
    fn name(&self) -> &str {
        "cross_venue_arb"
    }

    fn description(&self) -> &str {
        "Places and hedges orders across a primary and reference venue for binary-outcome markets"
    }

    async fn start(&mut self, ctx: &StrategyContext) -> StrategyResult<()> {
        while ctx.is_running() {
            self.registry.reap_finished().await;
            ctx.shutdown.interruptible_sleep(Duration::from_millis(500)).await;
        }
        Ok(())
    }

    async fn stop(&mut self) -> StrategyResult<()> {
        self.registry.reap_finished().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::cross_venue_arb::interfaces::{PlacedOrder, VenueOrderState, VenueOrderStatus};
    use crate::application::strategies::cross_venue_arb::types::OrderBookSnapshot;
    use async_trait::async_trait;

    fn opportunity() -> Opportunity {
        Opportunity {
            idempotency_key: "opp-1".into(),
            token_id_primary: "p".into(),
            token_id_hedge: "h".into(),
            quantity: 10.0,
            ask_primary: 0.45,
            ask_hedge: 0.54,
            max_cost: 1.0,
        }
    }

    struct StubPrimary;
    #[async_trait]
    impl PrimaryVenueClient for StubPrimary {
        async fn place_limit(&self, token_id: &str, price: f64, size: f64) -> Result<PlacedOrder, TaskErrorKind> {
            Ok(PlacedOrder { order_id: "o1".into(), token_id: token_id.into(), price, size })
        }
        async fn cancel(&self, _order_id: &str) -> Result<(), TaskErrorKind> {
            Ok(())
        }
        async fn order_status(&self, _order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind> {
            Ok(VenueOrderStatus { state: VenueOrderState::Open, filled_qty: 0.0, remaining_qty: 10.0 })
        }
        async fn order_book(&self, _token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
            unimplemented!()
        }
    }

    struct StubHedge;
    #[async_trait]
    impl HedgeVenueClient for StubHedge {
        async fn place_market_like(&self, token_id: &str, max_price: f64, size: f64) -> Result<PlacedOrder, TaskErrorKind> {
            Ok(PlacedOrder { order_id: "h1".into(), token_id: token_id.into(), price: max_price, size })
        }
        async fn order_status(&self, _order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind> {
            Ok(VenueOrderStatus { state: VenueOrderState::Filled, filled_qty: 0.0, remaining_qty: 0.0 })
        }
        async fn order_book(&self, token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
            Ok(OrderBookSnapshot { token_id: token_id.into(), bids: vec![], asks: vec![], fetched_at: std::time::Instant::now() })
        }
    }

    struct PendingStream;
    #[async_trait]
    impl WalletEventStream for PendingStream {
        async fn next_fill(&mut self) -> Option<crate::application::strategies::cross_venue_arb::types::FillEvent> {
            std::future::pending().await
        }
    }
    #[async_trait]
    impl ChainEventStream for PendingStream {
        async fn next_fill(&mut self) -> Option<crate::application::strategies::cross_venue_arb::types::FillEvent> {
            std::future::pending().await
        }
    }

    #[test]
    fn rejects_price_outside_venue_domain() {
        let strategy = CrossVenueArbStrategy::new(CrossVenueArbConfig::default());
        let mut opp = opportunity();
        opp.ask_primary = 1.5;
        let err = strategy
            .submit(opp, Arc::new(StubPrimary), Arc::new(StubHedge), Box::new(PendingStream), Box::new(PendingStream))
            .unwrap_err();
        assert!(matches!(err, TaskErrorKind::InvalidParams(_)));
    }

    #[test]
    fn rejects_opportunity_already_over_max_cost() {
        let strategy = CrossVenueArbStrategy::new(CrossVenueArbConfig::default());
        let mut opp = opportunity();
        opp.ask_hedge = 0.60; // pushes total_cost above max_cost=1.0
        let err = strategy
            .submit(opp, Arc::new(StubPrimary), Arc::new(StubHedge), Box::new(PendingStream), Box::new(PendingStream))
            .unwrap_err();
        assert!(matches!(err, TaskErrorKind::InvalidParams(_)));
    }

    #[tokio::test]
    async fn submit_wires_config_into_a_running_task() {
        let strategy = CrossVenueArbStrategy::new(CrossVenueArbConfig::default());
        let task_id = strategy
            .submit(opportunity(), Arc::new(StubPrimary), Arc::new(StubHedge), Box::new(PendingStream), Box::new(PendingStream))
            .expect("valid opportunity should be accepted");
        assert!(strategy.registry().is_running(&task_id));
        strategy.registry().cancel(&task_id);
    }
}
