//! Drives one task's state machine end to end: place on P, monitor H for
//! cost validity, reconcile fills from two independent sources, hedge
//! when the threshold is crossed, and terminate cleanly on timeout,
//! cost invalidation, cancel or full fill.
//!
//! The "adjusting" region — where a hedge attempt is being sized and
//! submitted — must restore its flag on every exit path, including an
//! early `?`-propagated error. Earlier designs tracked this with a bare
//! boolean that a forgotten early return could leave set forever; here
//! it is an RAII guard (`AdjustingGuard`) acquired at region entry, whose
//! `Drop` impl is the only thing that clears it (I5).

use super::cost_guard::CostGuard;
use super::fill_aggregator::FillAggregator;
use super::hedge_executor::HedgeExecutor;
use super::interfaces::{ChainEventStream, HedgeVenueClient, PrimaryVenueClient, WalletEventStream};
use super::order_lifecycle::{OrderLifecycle, OrderState};
use super::types::{FillEvent, Task, TaskErrorKind, TaskStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

const FILL_EPSILON: f64 = 1e-9;
const TEARDOWN_MAX_POLLS: u32 = 10;
const TEARDOWN_POLL_INTERVAL_MS: u64 = 200;

/// Typed SSE-style events a task publishes over its lifetime.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Created { task_id: String, sequence: u64 },
    StatusChanged { task_id: String, status: TaskStatus, sequence: u64 },
    Fill { task_id: String, effective_filled: f64, sequence: u64 },
    Hedge { task_id: String, order_id: String, sequence: u64 },
    Terminal { task_id: String, status: TaskStatus, error: Option<TaskErrorKind>, sequence: u64 },
}

/// RAII guard for the "adjusting" flag. Set on construction; cleared
/// unconditionally on drop, so it survives every exit path through the
/// hedge-sizing region — normal return, early return, or `?` bail-out.
struct AdjustingGuard {
    flag: Arc<AtomicBool>,
}

impl AdjustingGuard {
    fn acquire(flag: Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Release);
        Self { flag }
    }
}

impl Drop for AdjustingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct TaskExecutorDeps {
    pub primary: Arc<dyn PrimaryVenueClient>,
    pub hedge: Arc<dyn HedgeVenueClient>,
    pub wallet_stream: Box<dyn WalletEventStream>,
    pub chain_stream: Box<dyn ChainEventStream>,
    pub book_cache: Arc<super::orderbook_cache::OrderBookCache>,
    pub cost_poll_interval_ms: u64,
    pub rest_reconcile_ms: u64,
    pub decimals: u32,
}

pub struct TaskExecutor {
    events: broadcast::Sender<TaskEvent>,
    cancel_flag: Arc<AtomicBool>,
    adjusting_flag: Arc<AtomicBool>,
}

impl TaskExecutor {
    pub fn new(events: broadcast::Sender<TaskEvent>) -> Self {
        Self {
            events,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            adjusting_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    fn publish(&self, event: TaskEvent) {
        // A lagging/absent subscriber must never block task progress.
        let _ = self.events.send(event);
    }

    fn emit_status(&self, task: &mut Task, status: TaskStatus) {
        task.status = status;
        let sequence = task.next_sequence();
        self.publish(TaskEvent::StatusChanged {
            task_id: task.id.clone(),
            status,
            sequence,
        });
    }

    /// Run the full lifecycle for `task` to a terminal state.
    pub async fn run(&self, mut task: Task, mut deps: TaskExecutorDeps) -> Task {
        let sequence = task.next_sequence();
        self.publish(TaskEvent::Created {
            task_id: task.id.clone(),
            sequence,
        });

        match self.run_inner(&mut task, &mut deps).await {
            Ok(()) => {}
            Err(kind) => {
                task.terminal_error = Some(kind);
            }
        }

        self.finalize(&mut task);
        task
    }

    async fn run_inner(
        &self,
        task: &mut Task,
        deps: &mut TaskExecutorDeps,
    ) -> Result<(), TaskErrorKind> {
        // Phase A: place the primary-side order.
        let mut lifecycle = OrderLifecycle::new(deps.primary.clone());
        lifecycle
            .place(&task.params.token_id_primary, task.params.ask_primary, task.params.quantity)
            .await?;
        task.primary_order_id = lifecycle.order_id().map(str::to_string);
        self.emit_status(task, TaskStatus::OrderPlaced);

        let mut aggregator = FillAggregator::new(deps.decimals);
        let hedge_executor = HedgeExecutor::new(deps.hedge.clone(), task.params.max_hedge_retries);
        let mut cost_guard = CostGuard::spawn(
            deps.hedge.clone(),
            deps.book_cache.clone(),
            task.params.token_id_hedge.clone(),
            task.params.ask_primary,
            task.cost.max_cost,
            task.cost.max_ask_h,
            task.params.fee_rate_bps,
            deps.cost_poll_interval_ms,
        );

        let timeout = tokio::time::sleep(Duration::from_millis(task.params.order_timeout_ms));
        tokio::pin!(timeout);
        let mut rest_reconcile =
            tokio::time::interval(Duration::from_millis(deps.rest_reconcile_ms.max(1)));

        // Phase B: monitor until a terminal condition is reached. Every
        // exit path below — including early `?` bail-outs — still runs
        // Phase C teardown, since that's a plain function call after
        // `monitor` returns, not something that can be skipped by a
        // `return` inside the loop.
        let outcome = self
            .monitor(
                task,
                deps,
                &mut lifecycle,
                &mut aggregator,
                &hedge_executor,
                &mut cost_guard,
                &mut timeout,
                &mut rest_reconcile,
            )
            .await;

        self.teardown(task, &mut lifecycle, &mut aggregator, &hedge_executor)
            .await;

        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn monitor(
        &self,
        task: &mut Task,
        deps: &mut TaskExecutorDeps,
        lifecycle: &mut OrderLifecycle,
        aggregator: &mut FillAggregator,
        hedge_executor: &HedgeExecutor,
        cost_guard: &mut CostGuard,
        timeout: &mut std::pin::Pin<&mut tokio::time::Sleep>,
        rest_reconcile: &mut tokio::time::Interval,
    ) -> Result<(), TaskErrorKind> {
        loop {
            if self.cancel_flag.load(Ordering::Acquire) {
                return Err(TaskErrorKind::UserCancelled);
            }

            tokio::select! {
                _ = &mut *timeout => {
                    return Err(TaskErrorKind::OrderTimeout);
                }

                cost = cost_guard.changed() => {
                    match cost {
                        Ok(state) => {
                            task.cost = state;
                            if !state.is_valid() {
                                return Err(TaskErrorKind::CostInvalid);
                            }
                        }
                        Err(_) => {
                            warn!("cost guard channel closed for task {}", task.id);
                            return Err(TaskErrorKind::CostInvalid);
                        }
                    }
                }

                fill = deps.wallet_stream.next_fill() => {
                    if let Some(event) = fill {
                        self.handle_fill(task, aggregator, hedge_executor, lifecycle, event).await?;
                        if matches!(task.status, TaskStatus::Completed | TaskStatus::FullyFilled) {
                            return Ok(());
                        }
                    }
                }

                fill = deps.chain_stream.next_fill() => {
                    if let Some(event) = fill {
                        self.handle_fill(task, aggregator, hedge_executor, lifecycle, event).await?;
                        if matches!(task.status, TaskStatus::Completed | TaskStatus::FullyFilled) {
                            return Ok(());
                        }
                    }
                }

                _ = rest_reconcile.tick() => {
                    self.reconcile_rest(task, aggregator, hedge_executor, lifecycle).await?;
                    if matches!(task.status, TaskStatus::Completed | TaskStatus::FullyFilled) {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Poll the primary order's status through REST and fold any newly
    /// observed cumulative fill into the aggregator — the reconciliation
    /// floor that covers both a gapped WS stream (S5) and the cancel-race
    /// case of a `cancel` ack followed by a `FILLED` status (S6, P7).
    async fn reconcile_rest(
        &self,
        task: &mut Task,
        aggregator: &mut FillAggregator,
        hedge_executor: &HedgeExecutor,
        lifecycle: &mut OrderLifecycle,
    ) -> Result<(), TaskErrorKind> {
        let status = match lifecycle.poll_status().await {
            Ok(status) => status,
            Err(err) => {
                warn!("rest reconciliation poll failed for task {}: {:?}", task.id, err);
                return Ok(());
            }
        };

        if aggregator.ingest_rest_snapshot(status.filled_qty, task.params.ask_primary) {
            self.on_fill_advance(task, aggregator, hedge_executor, lifecycle).await?;
        }
        Ok(())
    }

    async fn handle_fill(
        &self,
        task: &mut Task,
        aggregator: &mut FillAggregator,
        hedge_executor: &HedgeExecutor,
        lifecycle: &mut OrderLifecycle,
        event: FillEvent,
    ) -> Result<(), TaskErrorKind> {
        if !aggregator.ingest(&event) {
            return Ok(());
        }
        self.on_fill_advance(task, aggregator, hedge_executor, lifecycle).await
    }

    /// Shared tail of both fill paths (event-driven and REST-polled):
    /// publish the advance, drive a hedge for whatever's newly unhedged,
    /// and promote the task to `FullyFilled`/`Completed` once the
    /// primary quantity is fully filled.
    async fn on_fill_advance(
        &self,
        task: &mut Task,
        aggregator: &mut FillAggregator,
        hedge_executor: &HedgeExecutor,
        lifecycle: &mut OrderLifecycle,
    ) -> Result<(), TaskErrorKind> {
        task.fills = aggregator.state().clone();
        let sequence = task.next_sequence();
        self.publish(TaskEvent::Fill {
            task_id: task.id.clone(),
            effective_filled: aggregator.effective_filled(),
            sequence,
        });

        if task.status == TaskStatus::OrderPlaced {
            self.emit_status(task, TaskStatus::PartiallyFilled);
        }

        self.drive_hedge(task, aggregator, hedge_executor).await?;

        if aggregator.is_fully_filled(task.params.quantity) {
            lifecycle.mark_filled();
            if aggregator.pending_hedge() <= FILL_EPSILON {
                self.emit_status(task, TaskStatus::Completed);
            } else if task.status != TaskStatus::FullyFilled {
                self.emit_status(task, TaskStatus::FullyFilled);
            }
        }

        Ok(())
    }

    /// Guarded region: size and submit a hedge for whatever portion of
    /// accumulated fills hasn't been hedged yet. Every exit below —
    /// including the `?` on a failed placement — runs through the
    /// guard's `Drop`, so `adjusting_flag` is never left set (I5).
    async fn drive_hedge(
        &self,
        task: &mut Task,
        aggregator: &mut FillAggregator,
        hedge_executor: &HedgeExecutor,
    ) -> Result<(), TaskErrorKind> {
        let _guard = AdjustingGuard::acquire(self.adjusting_flag.clone());

        let pending = aggregator.pending_hedge();
        if pending <= FILL_EPSILON {
            return Ok(());
        }

        let outcome = hedge_executor
            .hedge(
                &task.params.token_id_hedge,
                pending,
                task.cost.max_ask_h,
                task.params.min_hedge_notional,
                task.params.tick_hedge,
            )
            .await?;

        let Some(result) = outcome else {
            // Already in flight (can't happen under this executor's
            // strictly sequential driving, but the contract allows it)
            // or the pending amount doesn't clear the minimum notional
            // yet; wait for more fills to accumulate.
            return Ok(());
        };

        if result.filled_qty > 0.0 {
            aggregator.record_hedge(result.filled_qty, result.avg_price)?;
            task.hedge_attempts += 1;
            task.hedge_order_ids.extend(result.order_ids.iter().cloned());
            for order_id in result.order_ids {
                let sequence = task.next_sequence();
                self.publish(TaskEvent::Hedge {
                    task_id: task.id.clone(),
                    order_id,
                    sequence,
                });
            }
            if task.status != TaskStatus::Hedging {
                self.emit_status(task, TaskStatus::Hedging);
            }
        }

        // A stalled, incomplete hedge (retries exhausted, or the price
        // moved past the guarded ceiling) means new P fills should stop
        // being accepted: wind down now rather than keep accumulating an
        // unhedgeable position. `teardown` reports the residual.
        if !result.complete && result.stalled {
            return Err(TaskErrorKind::HedgeResidual(aggregator.pending_hedge()));
        }

        Ok(())
    }

    /// Phase C — triggered by any exit from `monitor`: fully filled,
    /// timeout, cost-invalid, cancel, or hedge residual. Cancels P if it
    /// may still be open, re-polls until a terminal venue status is
    /// observed (bounded, since teardown must never block indefinitely),
    /// reconciles any late fill the poll turns up, and makes one final
    /// attempt to drain whatever's hedgeable — bypassing the minimum
    /// notional floor, since this is the last chance before the residual
    /// becomes permanent.
    async fn teardown(
        &self,
        task: &mut Task,
        lifecycle: &mut OrderLifecycle,
        aggregator: &mut FillAggregator,
        hedge_executor: &HedgeExecutor,
    ) {
        if matches!(lifecycle.state(), OrderState::Open | OrderState::Cancelling) {
            if let Err(err) = lifecycle.cancel().await {
                warn!("teardown cancel failed for task {}: {:?}", task.id, err);
            }
        }

        for _ in 0..TEARDOWN_MAX_POLLS {
            let status = match lifecycle.poll_status().await {
                Ok(status) => status,
                Err(err) => {
                    warn!("teardown status poll failed for task {}: {:?}", task.id, err);
                    break;
                }
            };

            if aggregator.ingest_rest_snapshot(status.filled_qty, task.params.ask_primary) {
                task.fills = aggregator.state().clone();
                let sequence = task.next_sequence();
                self.publish(TaskEvent::Fill {
                    task_id: task.id.clone(),
                    effective_filled: aggregator.effective_filled(),
                    sequence,
                });
            }

            if status.state.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(TEARDOWN_POLL_INTERVAL_MS)).await;
        }

        let pending = aggregator.pending_hedge();
        if pending > FILL_EPSILON {
            match hedge_executor
                .hedge(
                    &task.params.token_id_hedge,
                    pending,
                    task.cost.max_ask_h,
                    0.0,
                    task.params.tick_hedge,
                )
                .await
            {
                Ok(Some(result)) if result.filled_qty > 0.0 => {
                    if let Err(err) = aggregator.record_hedge(result.filled_qty, result.avg_price) {
                        warn!("teardown hedge reconciliation failed for task {}: {:?}", task.id, err);
                    }
                    task.hedge_attempts += 1;
                    task.hedge_order_ids.extend(result.order_ids);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("teardown hedge drain failed for task {}: {:?}", task.id, err);
                }
            }
        }

        task.fills = aggregator.state().clone();

        let still_pending = aggregator.pending_hedge();
        if still_pending > FILL_EPSILON && task.terminal_error.is_none() {
            task.terminal_error = Some(TaskErrorKind::HedgeResidual(still_pending));
        }
    }

    /// Decide the task's terminal status from what actually happened,
    /// not just the triggering reason: any shares that got filled and
    /// fully hedged land as `Completed` even if the trigger was a
    /// timeout or a cancel race (S3, S6); zero-fill terminations land as
    /// `Cancelled`; anything left with an unhedged residual or an
    /// unrecoverable error lands as `Failed`.
    fn finalize(&self, task: &mut Task) {
        let filled = task.fills.effective_filled;
        let fully_hedged = (task.fills.effective_filled - task.fills.total_hedged).max(0.0) <= FILL_EPSILON;

        let status = match &task.terminal_error {
            None => TaskStatus::Completed,
            Some(_) if filled > FILL_EPSILON && fully_hedged => TaskStatus::Completed,
            Some(TaskErrorKind::UserCancelled)
            | Some(TaskErrorKind::CostInvalid)
            | Some(TaskErrorKind::OrderTimeout)
                if filled <= FILL_EPSILON =>
            {
                TaskStatus::Cancelled
            }
            _ => TaskStatus::Failed,
        };

        task.status = status;
        let sequence = task.next_sequence();
        info!(
            "task {} terminal: {:?} (reason={:?}, filled={}, hedged={})",
            task.id, status, task.terminal_error, filled, task.fills.total_hedged
        );
        self.publish(TaskEvent::Terminal {
            task_id: task.id.clone(),
            status,
            error: task.terminal_error.clone(),
            sequence,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjusting_guard_clears_flag_on_early_return() {
        let flag = Arc::new(AtomicBool::new(false));

        fn scoped(flag: Arc<AtomicBool>) -> Result<(), ()> {
            let _guard = AdjustingGuard::acquire(flag.clone());
            assert!(flag.load(Ordering::Acquire));
            Err(()) // early bail, guard still drops here
        }

        let _ = scoped(flag.clone());
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn adjusting_guard_clears_flag_on_panic_unwind() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = flag.clone();

        let result = std::panic::catch_unwind(move || {
            let _guard = AdjustingGuard::acquire(flag_clone.clone());
            panic!("boom");
        });

        assert!(result.is_err());
        assert!(!flag.load(Ordering::Acquire));
    }
}
