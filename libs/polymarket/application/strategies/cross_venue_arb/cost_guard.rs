//! Polls the hedge venue's book and republishes cost validity as a
//! `watch` channel instead of registering ad-hoc callbacks, so the
//! executor can `changed().await` it alongside every other concurrent
//! activity in one `tokio::select!`.

use super::interfaces::HedgeVenueClient;
use super::orderbook_cache::OrderBookCache;
use super::price_utils::total_cost;
use super::types::{CostState, TaskErrorKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

const MAX_CONSECUTIVE_FAILURES: u32 = 5;
const MAX_BACKOFF_MS: u64 = 60_000;

pub struct CostGuard {
    rx: watch::Receiver<CostState>,
}

impl CostGuard {
    /// Start polling `token_id_hedge`'s book on `poll_interval_ms`,
    /// republishing `CostState` each tick. `max_cost`/`max_ask_h` are
    /// fixed at creation and never recomputed; `total_cost` is live.
    ///
    /// Reads go through `book_cache` rather than straight to `client`:
    /// every concurrent task guarding the same hedge token shares one
    /// in-flight REST refresh instead of each spinning its own poll.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        client: Arc<dyn HedgeVenueClient>,
        book_cache: Arc<OrderBookCache>,
        token_id_hedge: String,
        ask_primary: f64,
        max_cost: f64,
        max_ask_h: f64,
        fee_rate_bps: u32,
        poll_interval_ms: u64,
    ) -> Self {
        let initial = CostState {
            max_cost,
            max_ask_h,
            total_cost: total_cost(ask_primary, max_ask_h, fee_rate_bps),
            fee_rate_bps,
        };
        let (tx, rx) = watch::channel(initial);

        tokio::spawn(async move {
            let mut consecutive_failures: u32 = 0;
            loop {
                if tx.is_closed() {
                    break;
                }

                match book_cache.get(client.as_ref(), &token_id_hedge).await {
                    Ok(book) => {
                        consecutive_failures = 0;
                        if let Some(ask_hedge) = book.best_ask() {
                            let state = CostState {
                                max_cost,
                                max_ask_h,
                                total_cost: total_cost(ask_primary, ask_hedge, fee_rate_bps),
                                fee_rate_bps,
                            };
                            if tx.send(state).is_err() {
                                break;
                            }
                        }
                    }
                    Err(TaskErrorKind::TransientNet(msg)) => {
                        consecutive_failures += 1;
                        warn!("cost guard poll failed (transient): {}", msg);
                    }
                    Err(err) => {
                        warn!("cost guard poll failed (permanent): {:?}", err);
                        let _ = tx.send(CostState {
                            max_cost,
                            max_ask_h,
                            total_cost: f64::INFINITY,
                            fee_rate_bps,
                        });
                        break;
                    }
                }

                let backoff = if consecutive_failures == 0 {
                    poll_interval_ms
                } else {
                    let scaled = poll_interval_ms.saturating_mul(1u64 << consecutive_failures.min(10));
                    scaled.min(MAX_BACKOFF_MS)
                };
                debug!("cost guard sleeping {}ms (failures={})", backoff, consecutive_failures);
                tokio::time::sleep(Duration::from_millis(backoff)).await;

                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    warn!("cost guard giving up after {} consecutive failures", consecutive_failures);
                    let _ = tx.send(CostState {
                        max_cost,
                        max_ask_h,
                        total_cost: f64::INFINITY,
                        fee_rate_bps,
                    });
                    break;
                }
            }
        });

        Self { rx }
    }

    pub fn current(&self) -> CostState {
        *self.rx.borrow()
    }

    /// Wait for the next published cost update.
    pub async fn changed(&mut self) -> Result<CostState, watch::error::RecvError> {
        self.rx.changed().await?;
        Ok(*self.rx.borrow())
    }
}
