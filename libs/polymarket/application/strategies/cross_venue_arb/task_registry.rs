//! Process-wide table of tasks keyed by idempotency key, with SSE-style
//! event fan-out and bounded terminal-task history.
//!
//! Spawning and teardown follow the same `JoinHandle` map + retain-on-
//! finish idiom `MarketMergerStrategy` uses for its per-market
//! accumulator tasks.

use super::task_executor::{TaskEvent, TaskExecutor, TaskExecutorDeps};
use super::types::{IdempotencyIndex, Task, TaskParams, TaskStatus};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

const DEFAULT_HISTORY_CAPACITY: usize = 500;
const EVENT_CHANNEL_CAPACITY: usize = 1024;

struct RunningTask {
    handle: JoinHandle<Task>,
    cancel_flag: Arc<AtomicBool>,
}

pub struct TaskRegistry {
    idempotency: RwLock<IdempotencyIndex>,
    running: DashMap<String, RunningTask>,
    history: RwLock<VecDeque<Task>>,
    history_capacity: usize,
    events: broadcast::Sender<TaskEvent>,
    next_id: std::sync::atomic::AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            idempotency: RwLock::new(IdempotencyIndex::new()),
            running: DashMap::new(),
            history: RwLock::new(VecDeque::new()),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            events,
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Create a new task for `params`, or return the id of the existing
    /// task if one was already created with the same idempotency key
    /// (P8). Spawns the executor loop and registers its `JoinHandle`.
    pub fn create(
        &self,
        params: TaskParams,
        cost: super::types::CostState,
        deps: TaskExecutorDeps,
    ) -> String {
        if let Some(existing) = self.idempotency.read().get(&params.idempotency_key).cloned() {
            return existing;
        }

        let mut idempotency = self.idempotency.write();
        if let Some(existing) = idempotency.get(&params.idempotency_key).cloned() {
            return existing;
        }

        let id = format!(
            "task-{}",
            self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        );
        idempotency.insert(params.idempotency_key.clone(), id.clone());
        drop(idempotency);

        let task = Task::new(id.clone(), params, cost);
        let executor = TaskExecutor::new(self.events.clone());
        let cancel_flag = executor.cancel_handle();

        let handle = tokio::spawn(async move { executor.run(task, deps).await });

        self.running.insert(id.clone(), RunningTask { handle, cancel_flag });
        info!("task {} created", id);
        id
    }

    /// Request cancellation of a running task. A no-op if the task is
    /// already terminal or unknown.
    pub fn cancel(&self, task_id: &str) {
        if let Some(entry) = self.running.get(task_id) {
            entry.cancel_flag.store(true, std::sync::atomic::Ordering::Release);
        }
    }

    /// Move any finished executors into history. Call periodically
    /// (the same `retain`-on-`is_finished` idiom the market merger
    /// strategy uses for its accumulator tasks), since `JoinHandle`
    /// results are otherwise only observable by awaiting them.
    pub async fn reap_finished(&self) {
        let finished_ids: Vec<String> = self
            .running
            .iter()
            .filter(|entry| entry.handle.is_finished())
            .map(|entry| entry.key().clone())
            .collect();

        for id in finished_ids {
            if let Some((_, running)) = self.running.remove(&id) {
                if let Ok(task) = running.handle.await {
                    self.push_history(task);
                }
            }
        }
    }

    fn push_history(&self, task: Task) {
        let mut history = self.history.write();
        if history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(task);
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    pub fn is_running(&self, task_id: &str) -> bool {
        self.running.contains_key(task_id)
    }

    pub fn terminal_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.history.read().iter().find(|t| t.id == task_id).map(|t| t.status)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::cross_venue_arb::interfaces::{
        ChainEventStream, HedgeVenueClient, PlacedOrder, PrimaryVenueClient, WalletEventStream,
    };
    use crate::application::strategies::cross_venue_arb::types::{CostState, OrderBookSnapshot, TaskErrorKind};
    use crate::application::strategies::cross_venue_arb::OrderBookCache;
    use async_trait::async_trait;

    struct NeverFillingPrimary;

    #[async_trait]
    impl PrimaryVenueClient for NeverFillingPrimary {
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
        async fn order_status(
            &self,
            _order_id: &str,
        ) -> Result<crate::application::strategies::cross_venue_arb::interfaces::VenueOrderStatus, TaskErrorKind>
        {
            use crate::application::strategies::cross_venue_arb::interfaces::{VenueOrderState, VenueOrderStatus};
            Ok(VenueOrderStatus {
                state: VenueOrderState::Open,
                filled_qty: 0.0,
                remaining_qty: 10.0,
            })
        }
        async fn order_book(&self, _token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
            unimplemented!()
        }
    }

    struct FakeHedge;

    #[async_trait]
    impl HedgeVenueClient for FakeHedge {
        async fn place_market_like(
            &self,
            token_id: &str,
            max_price: f64,
            size: f64,
        ) -> Result<PlacedOrder, TaskErrorKind> {
            Ok(PlacedOrder {
                order_id: "h1".into(),
                token_id: token_id.into(),
                price: max_price,
                size,
            })
        }
        async fn order_status(
            &self,
            _order_id: &str,
        ) -> Result<crate::application::strategies::cross_venue_arb::interfaces::VenueOrderStatus, TaskErrorKind>
        {
            use crate::application::strategies::cross_venue_arb::interfaces::{VenueOrderState, VenueOrderStatus};
            Ok(VenueOrderStatus {
                state: VenueOrderState::Filled,
                filled_qty: 0.0,
                remaining_qty: 0.0,
            })
        }
        async fn order_book(&self, token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
            Ok(OrderBookSnapshot {
                token_id: token_id.into(),
                bids: vec![],
                asks: vec![],
                fetched_at: std::time::Instant::now(),
            })
        }
    }

    struct EmptyWalletStream;
    #[async_trait]
    impl WalletEventStream for EmptyWalletStream {
        async fn next_fill(&mut self) -> Option<crate::application::strategies::cross_venue_arb::types::FillEvent> {
            std::future::pending().await
        }
    }

    struct EmptyChainStream;
    #[async_trait]
    impl ChainEventStream for EmptyChainStream {
        async fn next_fill(&mut self) -> Option<crate::application::strategies::cross_venue_arb::types::FillEvent> {
            std::future::pending().await
        }
    }

    fn test_params(key: &str) -> TaskParams {
        TaskParams {
            idempotency_key: key.into(),
            token_id_primary: "p".into(),
            token_id_hedge: "h".into(),
            quantity: 10.0,
            ask_primary: 0.45,
            ask_hedge: 0.54,
            max_cost: 1.0,
            order_timeout_ms: 50,
            max_hedge_retries: 3,
            min_hedge_notional: 1.0,
            fee_rate_bps: 90,
            tick_hedge: 0.01,
        }
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_returns_same_task_id() {
        let registry = TaskRegistry::new();
        let cost = CostState {
            max_cost: 1.0,
            max_ask_h: 0.54,
            total_cost: 0.999,
            fee_rate_bps: 90,
        };
        let deps1 = TaskExecutorDeps {
            primary: Arc::new(NeverFillingPrimary),
            hedge: Arc::new(FakeHedge),
            wallet_stream: Box::new(EmptyWalletStream),
            chain_stream: Box::new(EmptyChainStream),
            book_cache: Arc::new(OrderBookCache::new(2_000, 5_000)),
            cost_poll_interval_ms: 1_000,
            rest_reconcile_ms: 5_000,
            decimals: 18,
        };
        let id1 = registry.create(test_params("opp-1"), cost, deps1);

        let deps2 = TaskExecutorDeps {
            primary: Arc::new(NeverFillingPrimary),
            hedge: Arc::new(FakeHedge),
            wallet_stream: Box::new(EmptyWalletStream),
            chain_stream: Box::new(EmptyChainStream),
            book_cache: Arc::new(OrderBookCache::new(2_000, 5_000)),
            cost_poll_interval_ms: 1_000,
            rest_reconcile_ms: 5_000,
            decimals: 18,
        };
        let id2 = registry.create(test_params("opp-1"), cost, deps2);

        assert_eq!(id1, id2);
        registry.cancel(&id1);
    }
}
