//! The per-opportunity task record and its lifecycle status.

use super::cost::CostState;
use super::error::TaskErrorKind;
use super::fill::{DedupKey, FillEvent};
use serde::Serialize;
use std::collections::HashMap;

/// Parameters an opportunity is created with. Immutable for the life of
/// the task.
#[derive(Debug, Clone)]
pub struct TaskParams {
    pub idempotency_key: String,
    pub token_id_primary: String,
    pub token_id_hedge: String,
    pub quantity: f64,
    pub ask_primary: f64,
    pub ask_hedge: f64,
    /// Ceiling on `askP + askH + fee(askP)`; the static bound the
    /// opportunity was sized against (see `CostState::max_cost`).
    pub max_cost: f64,
    pub order_timeout_ms: u64,
    pub max_hedge_retries: u32,
    pub min_hedge_notional: f64,
    pub fee_rate_bps: u32,
    pub tick_hedge: f64,
}

/// Lifecycle status of a task, reported verbatim on `STATUS_CHANGED`
/// events. The terminal reason (timeout, cost invalidation, user
/// cancel, hedge residual, ...) travels separately on `Task::terminal_error`
/// — the status itself only records where the task landed: fully filled
/// and hedged (`Completed`), wound down with nothing at risk
/// (`Cancelled`), or wound down with an unrecoverable error
/// (`Failed`). A timeout or cost invalidation that still manages to
/// fill and hedge shares lands as `Completed`, not `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Created,
    OrderPlaced,
    PartiallyFilled,
    FullyFilled,
    Hedging,
    Completed,
    Cancelling,
    Cancelled,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Cancelled | TaskStatus::Failed
        )
    }
}

/// Accumulated fill state for the primary-side order, reconciled from
/// two independent event sources. `effective_filled` is the
/// monotonic max-merge of everything seen so far (I1); it never
/// decreases (I2 in the spec numbering covers the hedge bound below —
/// this field's own monotonicity is I1).
#[derive(Debug, Clone, Default)]
pub struct FillAggregatorState {
    pub seen_keys: std::collections::HashSet<DedupKey>,
    pub ws_filled: f64,
    pub rest_filled: f64,
    pub effective_filled: f64,
    pub avg_fill_price: f64,
    /// Cumulative hedged quantity. Invariant I2: never exceeds
    /// `effective_filled`.
    pub total_hedged: f64,
    pub hedge_price_sum: f64,
}

impl FillAggregatorState {
    /// Fold a new fill event in. Returns `true` if it changed
    /// `effective_filled` (i.e. was not a duplicate and advanced the max).
    pub fn ingest(&mut self, event: &FillEvent, size: f64) -> bool {
        if !self.seen_keys.insert(event.key.clone()) {
            return false;
        }

        match event.source {
            super::fill::FillSource::WalletWs => self.ws_filled += size,
            super::fill::FillSource::ChainWs | super::fill::FillSource::RestReconcile => {
                self.rest_filled += size
            }
        }

        self.bump_effective_filled(self.ws_filled.max(self.rest_filled), event.price)
    }

    /// Fold in a REST-polled cumulative filled quantity (`applyRestSnapshot`
    /// in the spec). REST is authoritative but, like every other source,
    /// never allowed to decrease `rest_filled`.
    pub fn ingest_rest_snapshot(&mut self, cumulative_qty: f64, price_hint: f64) -> bool {
        if cumulative_qty <= self.rest_filled {
            return false;
        }
        self.rest_filled = cumulative_qty;
        self.bump_effective_filled(self.ws_filled.max(self.rest_filled), price_hint)
    }

    fn bump_effective_filled(&mut self, candidate: f64, price: f64) -> bool {
        if candidate > self.effective_filled {
            let prior_notional = self.avg_fill_price * self.effective_filled;
            let added = candidate - self.effective_filled;
            self.avg_fill_price = if candidate > 0.0 {
                (prior_notional + price * added) / candidate
            } else {
                0.0
            };
            self.effective_filled = candidate;
            true
        } else {
            false
        }
    }

    /// Unhedged quantity accumulated so far (§3: `pendingHedge`).
    pub fn pending_hedge(&self) -> f64 {
        (self.effective_filled - self.total_hedged).max(0.0)
    }

    /// Record a completed hedge fill. Enforces I2 (`totalHedged <=
    /// effectiveFilled`) — a caller that tries to record more than is
    /// outstanding has a bug upstream, not something to silently clamp.
    pub fn record_hedge(&mut self, qty: f64, avg_price: f64) -> Result<(), TaskErrorKind> {
        const EPSILON: f64 = 1e-9;
        if self.total_hedged + qty > self.effective_filled + EPSILON {
            return Err(TaskErrorKind::InternalInvariant(format!(
                "record_hedge would push total_hedged ({}) past effective_filled ({})",
                self.total_hedged + qty,
                self.effective_filled
            )));
        }
        self.hedge_price_sum += qty * avg_price;
        self.total_hedged += qty;
        Ok(())
    }

    pub fn avg_hedge_price(&self) -> f64 {
        if self.total_hedged > 0.0 {
            self.hedge_price_sum / self.total_hedged
        } else {
            0.0
        }
    }
}

/// The full mutable record of one in-flight or terminal opportunity.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub params: TaskParams,
    pub status: TaskStatus,
    pub primary_order_id: Option<String>,
    pub hedge_order_ids: Vec<String>,
    pub fills: FillAggregatorState,
    pub cost: CostState,
    pub hedge_attempts: u32,
    pub terminal_error: Option<TaskErrorKind>,
    pub sequence: u64,
}

impl Task {
    pub fn new(id: String, params: TaskParams, cost: CostState) -> Self {
        Self {
            id,
            params,
            status: TaskStatus::Created,
            primary_order_id: None,
            hedge_order_ids: Vec::new(),
            fills: FillAggregatorState::default(),
            cost,
            hedge_attempts: 0,
            terminal_error: None,
            sequence: 0,
        }
    }

    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// Per-process map of idempotency key to the task id it produced, so a
/// duplicate `create` is a no-op that returns the existing task.
pub type IdempotencyIndex = HashMap<String, String>;
