//! End-to-end scenarios for the cross-venue arbitrage task execution engine,
//! driving the real `TaskExecutor` against in-memory fakes for both venues
//! and both fill-event streams. Mirrors the concrete scenarios from the
//! design spec (S1, S2, S3, S6) rather than re-testing the pure-function
//! properties already covered by `cross_venue_arb_properties.rs`.
//!
//! Run with: cargo test -p polymarket cross_venue_arb_scenarios

use async_trait::async_trait;
use num_bigint::BigUint;
use polymarket::application::strategies::cross_venue_arb::interfaces::{
    ChainEventStream, HedgeVenueClient, PlacedOrder, PrimaryVenueClient, VenueOrderState,
    VenueOrderStatus, WalletEventStream,
};
use polymarket::application::strategies::cross_venue_arb::types::{
    CostState, DedupKey, FillEvent, FillSource, OrderBookSnapshot, Task, TaskErrorKind, TaskParams,
    TaskStatus,
};
use polymarket::application::strategies::cross_venue_arb::{OrderBookCache, TaskEvent, TaskExecutor, TaskExecutorDeps};
use polymarket::infrastructure::client::clob::PriceLevel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::broadcast;

fn params(order_timeout_ms: u64) -> TaskParams {
    TaskParams {
        idempotency_key: "opp-1".into(),
        token_id_primary: "p".into(),
        token_id_hedge: "h".into(),
        quantity: 10.0,
        ask_primary: 0.45,
        ask_hedge: 0.54,
        max_cost: 1.000,
        order_timeout_ms,
        max_hedge_retries: 3,
        min_hedge_notional: 1.0,
        fee_rate_bps: 200,
        tick_hedge: 0.001,
    }
}

fn cost_state() -> CostState {
    CostState {
        max_cost: 1.000,
        max_ask_h: 0.541,
        total_cost: 0.999,
        fee_rate_bps: 200,
    }
}

/// Primary venue fake: reports a fixed status once placed, settable after
/// construction to simulate a status transition observed on a later poll
/// (the cancel-race case, S6).
struct FakePrimary {
    status: Mutex<VenueOrderStatus>,
    cancel_calls: Mutex<u32>,
}

impl FakePrimary {
    fn new(status: VenueOrderStatus) -> Self {
        Self {
            status: Mutex::new(status),
            cancel_calls: Mutex::new(0),
        }
    }

    fn set_status(&self, status: VenueOrderStatus) {
        *self.status.lock().unwrap() = status;
    }
}

#[async_trait]
impl PrimaryVenueClient for FakePrimary {
    async fn place_limit(&self, token_id: &str, price: f64, size: f64) -> Result<PlacedOrder, TaskErrorKind> {
        Ok(PlacedOrder {
            order_id: "p1".into(),
            token_id: token_id.into(),
            price,
            size,
        })
    }

    async fn cancel(&self, _order_id: &str) -> Result<(), TaskErrorKind> {
        *self.cancel_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn order_status(&self, _order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind> {
        Ok(*self.status.lock().unwrap())
    }

    async fn order_book(&self, _token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
        unimplemented!("primary book not needed by these scenarios")
    }
}

/// Hedge venue fake: one fixed best ask, and a queue of fill sizes consumed
/// on each successive `order_status` call (mirrors the hedge executor's own
/// test fake).
struct FakeHedge {
    ask: Mutex<f64>,
    fill_sequence: Mutex<Vec<f64>>,
}

impl FakeHedge {
    fn new(ask: f64, fills: Vec<f64>) -> Self {
        Self {
            ask: Mutex::new(ask),
            fill_sequence: Mutex::new(fills),
        }
    }
}

#[async_trait]
impl HedgeVenueClient for FakeHedge {
    async fn place_market_like(&self, token_id: &str, max_price: f64, size: f64) -> Result<PlacedOrder, TaskErrorKind> {
        Ok(PlacedOrder {
            order_id: "h1".into(),
            token_id: token_id.into(),
            price: max_price,
            size,
        })
    }

    async fn order_status(&self, _order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind> {
        let mut seq = self.fill_sequence.lock().unwrap();
        let filled = if seq.is_empty() { 0.0 } else { seq.remove(0) };
        Ok(VenueOrderStatus {
            state: VenueOrderState::Filled,
            filled_qty: filled,
            remaining_qty: 0.0,
        })
    }

    async fn order_book(&self, token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
        Ok(OrderBookSnapshot {
            token_id: token_id.into(),
            bids: vec![],
            asks: vec![PriceLevel {
                price: self.ask.lock().unwrap().to_string(),
                size: "1000".to_string(),
            }],
            fetched_at: Instant::now(),
        })
    }
}

/// A fill-event stream that yields a fixed sequence once, then hangs
/// forever — `select!` only ever observes real sources go quiet, never a
/// terminated stream.
struct QueuedFillStream {
    queued: Mutex<Vec<FillEvent>>,
}

impl QueuedFillStream {
    fn new(events: Vec<FillEvent>) -> Self {
        Self {
            queued: Mutex::new(events),
        }
    }

    fn empty() -> Self {
        Self::new(vec![])
    }

    async fn pop(&self) -> Option<FillEvent> {
        let next = self.queued.lock().unwrap().pop();
        match next {
            Some(event) => Some(event),
            None => std::future::pending().await,
        }
    }
}

struct FakeWallet(QueuedFillStream);
#[async_trait]
impl WalletEventStream for FakeWallet {
    async fn next_fill(&mut self) -> Option<FillEvent> {
        self.0.pop().await
    }
}

struct FakeChain(QueuedFillStream);
#[async_trait]
impl ChainEventStream for FakeChain {
    async fn next_fill(&mut self) -> Option<FillEvent> {
        self.0.pop().await
    }
}

fn wallet_fill(nonce: u64, qty: f64, price: f64) -> FillEvent {
    FillEvent {
        key: DedupKey::Wallet {
            order_hash: "p1".into(),
            nonce,
        },
        source: FillSource::WalletWs,
        filled_base_units: BigUint::from((qty * 1e6) as u128),
        price,
        observed_at_ms: 0,
    }
}

fn deps(primary: Arc<FakePrimary>, hedge: Arc<FakeHedge>, wallet: FakeWallet, chain: FakeChain, cost_poll_ms: u64, rest_ms: u64) -> TaskExecutorDeps {
    TaskExecutorDeps {
        primary,
        hedge,
        wallet_stream: Box::new(wallet),
        chain_stream: Box::new(chain),
        book_cache: Arc::new(OrderBookCache::new(50, 100)),
        cost_poll_interval_ms: cost_poll_ms,
        rest_reconcile_ms: rest_ms,
        decimals: 6,
    }
}

/// S1: normal profitable fill. A single wallet-WS fill covers the whole
/// requested quantity at a cost comfortably under `maxCost`; the hedge
/// executor immediately buys the matching size on H.
#[tokio::test]
async fn s1_normal_profitable_fill_completes_and_hedges_in_full() {
    let primary = Arc::new(FakePrimary::new(VenueOrderStatus {
        state: VenueOrderState::Filled,
        filled_qty: 10.0,
        remaining_qty: 0.0,
    }));
    let hedge = Arc::new(FakeHedge::new(0.54, vec![10.0]));
    let wallet = FakeWallet(QueuedFillStream::new(vec![wallet_fill(0, 10.0, 0.45)]));
    let chain = FakeChain(QueuedFillStream::empty());

    let (events, _rx) = broadcast::channel(64);
    let executor = TaskExecutor::new(events);
    let task = Task::new("task-s1".into(), params(10_000), cost_state());
    let d = deps(primary, hedge, wallet, chain, 5_000, 30_000);

    let finished = tokio::time::timeout(std::time::Duration::from_secs(5), executor.run(task, d))
        .await
        .expect("task did not finish");

    assert_eq!(finished.status, TaskStatus::Completed);
    assert!((finished.fills.effective_filled - 10.0).abs() < 1e-6);
    assert!((finished.fills.total_hedged - 10.0).abs() < 1e-6);
}

/// S2: cost invalidation mid-flight. The hedge venue's ask has already
/// moved past the guarded ceiling by the time the cost guard's first tick
/// runs, so the task cancels with nothing filled.
#[tokio::test]
async fn s2_cost_invalidation_cancels_with_zero_fill() {
    let primary = Arc::new(FakePrimary::new(VenueOrderStatus {
        state: VenueOrderState::Cancelled,
        filled_qty: 0.0,
        remaining_qty: 0.0,
    }));
    // askH moves from 0.54 to 0.56: total_cost = 0.45 + 0.56 + 0.009 = 1.019 > 1.000
    let hedge = Arc::new(FakeHedge::new(0.56, vec![]));
    let wallet = FakeWallet(QueuedFillStream::empty());
    let chain = FakeChain(QueuedFillStream::empty());

    let (events, _rx) = broadcast::channel(64);
    let executor = TaskExecutor::new(events);
    let task = Task::new("task-s2".into(), params(10_000), cost_state());
    let d = deps(primary, hedge, wallet, chain, 20, 30_000);

    let finished = tokio::time::timeout(std::time::Duration::from_secs(5), executor.run(task, d))
        .await
        .expect("task did not finish");

    assert_eq!(finished.status, TaskStatus::Cancelled);
    assert_eq!(finished.terminal_error, Some(TaskErrorKind::CostInvalid));
    assert_eq!(finished.fills.effective_filled, 0.0);
    assert_eq!(finished.fills.total_hedged, 0.0);
}

/// S3: partial fill then timeout. A 4-share fill arrives and gets hedged
/// immediately; the order then times out with 6 shares never filled.
/// Despite the timeout trigger, the task still lands `Completed` because
/// everything that did fill got fully hedged.
#[tokio::test]
async fn s3_partial_fill_then_timeout_completes_on_the_filled_remainder() {
    let primary = Arc::new(FakePrimary::new(VenueOrderStatus {
        state: VenueOrderState::Cancelled,
        filled_qty: 4.0,
        remaining_qty: 0.0,
    }));
    let hedge = Arc::new(FakeHedge::new(0.54, vec![4.0]));
    let wallet = FakeWallet(QueuedFillStream::new(vec![wallet_fill(0, 4.0, 0.45)]));
    let chain = FakeChain(QueuedFillStream::empty());

    let (events, _rx) = broadcast::channel(64);
    let executor = TaskExecutor::new(events);
    let task = Task::new("task-s3".into(), params(80), cost_state());
    let d = deps(primary, hedge, wallet, chain, 10_000, 30_000);

    let finished = tokio::time::timeout(std::time::Duration::from_secs(5), executor.run(task, d))
        .await
        .expect("task did not finish");

    assert_eq!(finished.status, TaskStatus::Completed);
    assert_eq!(finished.terminal_error, Some(TaskErrorKind::OrderTimeout));
    assert!((finished.fills.effective_filled - 4.0).abs() < 1e-6);
    assert!((finished.fills.total_hedged - 4.0).abs() < 1e-6);
}

/// S6 / P7: cancel race. An external cancel is requested before any fill is
/// observed over WS, but the subsequent reconciliation poll during teardown
/// reveals the order actually reached `FILLED` for the full quantity before
/// the cancel took effect. The executor must not trust the cancel over the
/// poll: it reconciles the late fill and hedges it, landing `Completed`.
#[tokio::test]
async fn s6_cancel_race_reconciles_late_fill_into_completed() {
    // The venue already reflects a full fill by the time the user's cancel
    // request is observed — the executor's own cancel ack is never taken as
    // proof of zero fill, so the teardown reconciliation poll finds it.
    let primary = Arc::new(FakePrimary::new(VenueOrderStatus {
        state: VenueOrderState::Filled,
        filled_qty: 10.0,
        remaining_qty: 0.0,
    }));
    let hedge = Arc::new(FakeHedge::new(0.54, vec![10.0]));
    let wallet = FakeWallet(QueuedFillStream::empty());
    let chain = FakeChain(QueuedFillStream::empty());

    let (events, _rx) = broadcast::channel(64);
    let executor = TaskExecutor::new(events);
    let cancel_flag = executor.cancel_handle();
    // Cancel requested before the monitor loop observes any WS fill event.
    cancel_flag.store(true, Ordering::Release);
    let task = Task::new("task-s6".into(), params(10_000), cost_state());
    let d = deps(primary.clone(), hedge, wallet, chain, 10_000, 10_000);

    let finished = tokio::time::timeout(std::time::Duration::from_secs(5), executor.run(task, d))
        .await
        .expect("task did not finish");

    assert_eq!(finished.status, TaskStatus::Completed);
    assert!((finished.fills.effective_filled - 10.0).abs() < 1e-6);
    assert!((finished.fills.total_hedged - 10.0).abs() < 1e-6);
    assert!(*primary.cancel_calls.lock().unwrap() >= 1);
}

/// The registry's broadcast channel carries every event a task publishes
/// over its lifetime, terminating in exactly one `Terminal` event whose
/// sequence number is the highest seen for that task.
#[tokio::test]
async fn task_events_terminate_in_exactly_one_terminal_event() {
    let primary = Arc::new(FakePrimary::new(VenueOrderStatus {
        state: VenueOrderState::Filled,
        filled_qty: 10.0,
        remaining_qty: 0.0,
    }));
    let hedge = Arc::new(FakeHedge::new(0.54, vec![10.0]));
    let wallet = FakeWallet(QueuedFillStream::new(vec![wallet_fill(0, 10.0, 0.45)]));
    let chain = FakeChain(QueuedFillStream::empty());

    let (events, mut rx) = broadcast::channel(64);
    let executor = TaskExecutor::new(events);
    let task = Task::new("task-events".into(), params(10_000), cost_state());
    let d = deps(primary, hedge, wallet, chain, 5_000, 30_000);

    let handle = tokio::spawn(async move { executor.run(task, d).await });

    let mut terminal_count = 0;
    loop {
        match tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv()).await {
            Ok(Ok(TaskEvent::Terminal { status, .. })) => {
                terminal_count += 1;
                assert_eq!(status, TaskStatus::Completed);
            }
            Ok(Ok(_)) => continue,
            Ok(Err(_)) | Err(_) => break,
        }
        if handle.is_finished() {
            break;
        }
    }

    let _ = handle.await;
    assert_eq!(terminal_count, 1);
}
