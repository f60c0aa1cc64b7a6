//! Places hedge orders on venue H, enforcing exactly one in-flight
//! hedge attempt at a time (I4), and the partial-fill retry procedure
//! from spec §4.6: submit at the guarded ceiling price, poll the
//! resulting order, and retry the unhedged remainder at a refreshed
//! price as long as it still clears the minimum notional.

use super::interfaces::{HedgeVenueClient, VenueOrderState};
use super::price_utils::{align_up, floor_quantity};
use super::types::TaskErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one `hedge` call, which may have internally retried the
/// unhedged remainder several times.
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeResult {
    pub filled_qty: f64,
    pub avg_price: f64,
    pub complete: bool,
    /// `true` only when the remainder stopped being chased for a reason
    /// the caller should treat as a failure (retries exhausted, or the
    /// refreshed ask no longer clears the guarded ceiling) rather than
    /// "too small to bother yet" (below `min_notional`). The caller uses
    /// this to decide whether to surface `HEDGE_RESIDUAL` now or simply
    /// wait for more fills to accumulate.
    pub stalled: bool,
    pub order_ids: Vec<String>,
}

/// RAII release of the single-in-flight-hedge flag (I4). Cleared on
/// every exit path, including an early `?` return from inside `hedge`.
struct HedgePendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for HedgePendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct HedgeExecutor {
    client: Arc<dyn HedgeVenueClient>,
    hedge_pending: AtomicBool,
    max_retries: u32,
}

impl HedgeExecutor {
    pub fn new(client: Arc<dyn HedgeVenueClient>, max_retries: u32) -> Self {
        Self {
            client,
            hedge_pending: AtomicBool::new(false),
            max_retries,
        }
    }

    /// Attempt to hedge `qty` shares of `token_id`, never paying more
    /// than `max_ask_h`. Returns `Ok(None)` (not an error) if a hedge is
    /// already in flight or the notional doesn't clear `min_notional` —
    /// the caller should simply try again on the next tick rather than
    /// queue a second attempt.
    pub async fn hedge(
        &self,
        token_id: &str,
        qty: f64,
        max_ask_h: f64,
        min_notional: f64,
        tick_hedge: f64,
    ) -> Result<Option<HedgeResult>, TaskErrorKind> {
        if qty <= 0.0 {
            return Ok(None);
        }

        if self
            .hedge_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }
        let _guard = HedgePendingGuard {
            flag: &self.hedge_pending,
        };

        // Step 1: reject up front if the book already violates the bound.
        let book = self.client.order_book(token_id).await?;
        let ask_h = book
            .best_ask()
            .ok_or_else(|| TaskErrorKind::PermanentVenue("hedge venue book is empty".into()))?;
        if ask_h > max_ask_h {
            return Err(TaskErrorKind::HedgePriceRejected);
        }
        if qty * ask_h < min_notional {
            return Ok(None);
        }

        let mut remaining = qty;
        let mut total_filled = 0.0;
        let mut notional_sum = 0.0;
        let mut attempts = 0u32;
        let mut order_ids = Vec::new();
        let mut stalled = false;

        let price = align_up(max_ask_h, tick_hedge);
        loop {
            let size = floor_quantity(remaining, 1e-6);
            if size <= 0.0 {
                break;
            }

            info!(
                "placing hedge: token={} price={} size={} attempt={}",
                token_id, price, size, attempts
            );
            let placed = self.client.place_market_like(token_id, price, size).await?;
            order_ids.push(placed.order_id.clone());
            attempts += 1;

            let status = self.client.order_status(&placed.order_id).await?;
            total_filled += status.filled_qty;
            notional_sum += status.filled_qty * price;
            remaining = (remaining - status.filled_qty).max(0.0);

            if remaining <= 1e-9 || status.state == VenueOrderState::Filled {
                break;
            }

            // Step 3: partial fill. Only retry if the remainder still
            // clears the minimum notional and we haven't exhausted the
            // retry budget; otherwise accept the partial.
            if attempts >= self.max_retries {
                warn!(
                    "hedge retries exhausted for {} with {} unhedged",
                    token_id, remaining
                );
                stalled = true;
                break;
            }

            let refreshed = self.client.order_book(token_id).await?;
            let refreshed_ask = match refreshed.best_ask() {
                Some(a) if a <= max_ask_h => a,
                _ => {
                    warn!("hedge price no longer clears bound, accepting partial");
                    stalled = true;
                    break;
                }
            };
            if remaining * refreshed_ask < min_notional {
                break;
            }
        }

        let avg_price = if total_filled > 0.0 {
            notional_sum / total_filled
        } else {
            0.0
        };
        Ok(Some(HedgeResult {
            filled_qty: total_filled,
            avg_price,
            complete: remaining <= 1e-9,
            stalled,
            order_ids,
        }))
    }

    pub fn is_pending(&self) -> bool {
        self.hedge_pending.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::OrderBookSnapshot;
    use crate::application::strategies::cross_venue_arb::interfaces::{PlacedOrder, VenueOrderStatus};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeHedgeClient {
        calls: Mutex<u32>,
        ask: f64,
        fill_sequence: Mutex<Vec<f64>>,
    }

    #[async_trait]
    impl HedgeVenueClient for FakeHedgeClient {
        async fn place_market_like(
            &self,
            token_id: &str,
            price: f64,
            size: f64,
        ) -> Result<PlacedOrder, TaskErrorKind> {
            *self.calls.lock().unwrap() += 1;
            Ok(PlacedOrder {
                order_id: format!("h{}", self.calls.lock().unwrap()),
                token_id: token_id.into(),
                price,
                size,
            })
        }

        async fn order_status(&self, _order_id: &str) -> Result<VenueOrderStatus, TaskErrorKind> {
            let mut seq = self.fill_sequence.lock().unwrap();
            let filled = if seq.is_empty() { 0.0 } else { seq.remove(0) };
            Ok(VenueOrderStatus {
                state: VenueOrderState::PartiallyFilled,
                filled_qty: filled,
                remaining_qty: 0.0,
            })
        }

        async fn order_book(&self, token_id: &str) -> Result<OrderBookSnapshot, TaskErrorKind> {
            use crate::infrastructure::client::clob::PriceLevel;
            Ok(OrderBookSnapshot {
                token_id: token_id.into(),
                bids: vec![],
                asks: vec![PriceLevel {
                    price: self.ask.to_string(),
                    size: "1000".to_string(),
                }],
                fetched_at: std::time::Instant::now(),
            })
        }
    }

    #[tokio::test]
    async fn below_min_notional_is_skipped_without_placing() {
        let client = Arc::new(FakeHedgeClient {
            calls: Mutex::new(0),
            ask: 0.5,
            fill_sequence: Mutex::new(vec![]),
        });
        let executor = HedgeExecutor::new(client.clone(), 3);
        let result = executor.hedge("tok", 0.5, 0.6, 1.0, 0.01).await.unwrap();
        assert!(result.is_none());
        assert_eq!(*client.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn price_above_bound_is_rejected() {
        let client = Arc::new(FakeHedgeClient {
            calls: Mutex::new(0),
            ask: 0.6,
            fill_sequence: Mutex::new(vec![]),
        });
        let executor = HedgeExecutor::new(client, 3);
        let err = executor.hedge("tok", 10.0, 0.5, 1.0, 0.01).await;
        assert!(matches!(err, Err(TaskErrorKind::HedgePriceRejected)));
    }

    #[tokio::test]
    async fn full_fill_on_first_attempt_reports_complete() {
        let client = Arc::new(FakeHedgeClient {
            calls: Mutex::new(0),
            ask: 0.5,
            fill_sequence: Mutex::new(vec![10.0]),
        });
        let executor = HedgeExecutor::new(client.clone(), 3);
        let result = executor.hedge("tok", 10.0, 0.54, 1.0, 0.01).await.unwrap().unwrap();
        assert!(result.complete);
        assert!((result.filled_qty - 10.0).abs() < 1e-9);
        assert_eq!(*client.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn partial_fill_retries_remainder_then_completes() {
        let client = Arc::new(FakeHedgeClient {
            calls: Mutex::new(0),
            ask: 0.5,
            fill_sequence: Mutex::new(vec![6.0, 4.0]),
        });
        let executor = HedgeExecutor::new(client.clone(), 3);
        let result = executor.hedge("tok", 10.0, 0.54, 1.0, 0.01).await.unwrap().unwrap();
        assert!(result.complete);
        assert!((result.filled_qty - 10.0).abs() < 1e-9);
        assert_eq!(*client.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn partial_fill_below_min_notional_accepts_partial() {
        let client = Arc::new(FakeHedgeClient {
            calls: Mutex::new(0),
            ask: 0.5,
            fill_sequence: Mutex::new(vec![9.99]),
        });
        let executor = HedgeExecutor::new(client.clone(), 3);
        // remainder 0.01 * ask 0.5 << min_notional 1.0 -> accept partial.
        let result = executor.hedge("tok", 10.0, 0.54, 1.0, 0.01).await.unwrap().unwrap();
        assert!(!result.complete);
        assert!(!result.stalled);
        assert!((result.filled_qty - 9.99).abs() < 1e-9);
        assert_eq!(*client.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn retries_exhausted_reports_stalled_not_just_incomplete() {
        let client = Arc::new(FakeHedgeClient {
            calls: Mutex::new(0),
            ask: 0.5,
            fill_sequence: Mutex::new(vec![2.0, 2.0, 2.0]),
        });
        let executor = HedgeExecutor::new(client.clone(), 3);
        let result = executor.hedge("tok", 10.0, 0.54, 1.0, 0.01).await.unwrap().unwrap();
        assert!(!result.complete);
        assert!(result.stalled);
        assert_eq!(*client.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn pending_flag_releases_after_completion() {
        let client = Arc::new(FakeHedgeClient {
            calls: Mutex::new(0),
            ask: 0.5,
            fill_sequence: Mutex::new(vec![10.0]),
        });
        let executor = HedgeExecutor::new(client, 3);
        executor.hedge("tok", 10.0, 0.54, 1.0, 0.01).await.unwrap();
        assert!(!executor.is_pending());
    }

    #[tokio::test]
    async fn pending_flag_releases_even_on_rejection() {
        let client = Arc::new(FakeHedgeClient {
            calls: Mutex::new(0),
            ask: 0.6,
            fill_sequence: Mutex::new(vec![]),
        });
        let executor = HedgeExecutor::new(client, 3);
        let _ = executor.hedge("tok", 10.0, 0.5, 1.0, 0.01).await;
        assert!(!executor.is_pending());
    }
}
