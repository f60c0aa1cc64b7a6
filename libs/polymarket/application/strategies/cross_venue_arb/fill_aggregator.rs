//! Reconciles fills from wallet-WS and chain-WS into one monotonic
//! effective-filled quantity per task.
//!
//! Both sources can redeliver the same fill (reconnect replay, REST
//! reconciliation re-observing an already-seen trade); `ingest` is
//! idempotent under replay (P2) and `effective_filled` only ever
//! increases (I1/I2), by construction of `FillAggregatorState::ingest`.

use super::types::{FillAggregatorState, FillEvent, TaskErrorKind};

pub struct FillAggregator {
    state: FillAggregatorState,
    decimals: u32,
}

impl FillAggregator {
    pub fn new(decimals: u32) -> Self {
        Self {
            state: FillAggregatorState::default(),
            decimals,
        }
    }

    /// Fold in a fill event observed from either source. Returns `true`
    /// if `effective_filled` advanced.
    pub fn ingest(&mut self, event: &FillEvent) -> bool {
        let size = event.filled_size(self.decimals);
        self.state.ingest(event, size)
    }

    /// Fold in a REST-polled cumulative filled quantity (the
    /// reconciliation floor). Returns `true` if `effective_filled`
    /// advanced.
    pub fn ingest_rest_snapshot(&mut self, cumulative_qty: f64, price_hint: f64) -> bool {
        self.state.ingest_rest_snapshot(cumulative_qty, price_hint)
    }

    pub fn effective_filled(&self) -> f64 {
        self.state.effective_filled
    }

    pub fn avg_fill_price(&self) -> f64 {
        self.state.avg_fill_price
    }

    /// Unhedged quantity accumulated so far (`pendingHedge`).
    pub fn pending_hedge(&self) -> f64 {
        self.state.pending_hedge()
    }

    pub fn total_hedged(&self) -> f64 {
        self.state.total_hedged
    }

    pub fn avg_hedge_price(&self) -> f64 {
        self.state.avg_hedge_price()
    }

    /// Record a completed hedge fill against this task (I2, I4 caller
    /// serializes so only one call is ever in flight at a time).
    pub fn record_hedge(&mut self, qty: f64, avg_price: f64) -> Result<(), TaskErrorKind> {
        self.state.record_hedge(qty, avg_price)
    }

    pub fn is_fully_filled(&self, target_quantity: f64) -> bool {
        self.state.effective_filled + 1e-9 >= target_quantity
    }

    pub fn state(&self) -> &FillAggregatorState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::cross_venue_arb::types::{DedupKey, FillSource};
    use num_bigint::BigUint;

    fn fill(key: DedupKey, source: FillSource, size: f64, price: f64) -> FillEvent {
        FillEvent {
            key,
            source,
            filled_base_units: BigUint::from((size * 1e18) as u128),
            price,
            observed_at_ms: 0,
        }
    }

    #[test]
    fn duplicate_delivery_is_a_no_op() {
        let mut agg = FillAggregator::new(18);
        let key = DedupKey::Wallet {
            order_hash: "0x1".into(),
            nonce: 0,
        };
        assert!(agg.ingest(&fill(key.clone(), FillSource::WalletWs, 5.0, 0.45)));
        assert!(!agg.ingest(&fill(key, FillSource::WalletWs, 5.0, 0.45)));
        assert_eq!(agg.effective_filled(), 5.0);
    }

    #[test]
    fn max_merge_takes_the_larger_source_total() {
        let mut agg = FillAggregator::new(18);
        agg.ingest(&fill(
            DedupKey::Wallet {
                order_hash: "0x1".into(),
                nonce: 0,
            },
            FillSource::WalletWs,
            4.0,
            0.45,
        ));
        agg.ingest(&fill(
            DedupKey::Chain {
                tx_hash: "0xa".into(),
                log_index: 0,
            },
            FillSource::ChainWs,
            7.0,
            0.46,
        ));
        // chain total (7.0) now exceeds wallet total (4.0); effective
        // filled tracks the max, never the sum.
        assert_eq!(agg.effective_filled(), 7.0);
    }

    #[test]
    fn effective_filled_never_decreases_across_out_of_order_delivery() {
        let mut agg = FillAggregator::new(18);
        agg.ingest(&fill(
            DedupKey::Chain {
                tx_hash: "0xa".into(),
                log_index: 0,
            },
            FillSource::ChainWs,
            9.0,
            0.45,
        ));
        let before = agg.effective_filled();
        agg.ingest(&fill(
            DedupKey::Wallet {
                order_hash: "0x1".into(),
                nonce: 0,
            },
            FillSource::WalletWs,
            2.0,
            0.45,
        ));
        assert!(agg.effective_filled() >= before);
    }

    #[test]
    fn record_hedge_enforces_i2() {
        let mut agg = FillAggregator::new(18);
        agg.ingest(&fill(
            DedupKey::Wallet { order_hash: "0x1".into(), nonce: 0 },
            FillSource::WalletWs,
            5.0,
            0.45,
        ));
        assert!(agg.record_hedge(5.0, 0.54).is_ok());
        assert_eq!(agg.total_hedged(), 5.0);
        assert_eq!(agg.pending_hedge(), 0.0);

        // Attempting to hedge past what's actually been filled trips I2.
        assert!(agg.record_hedge(1.0, 0.54).is_err());
        assert_eq!(agg.total_hedged(), 5.0);
    }

    #[test]
    fn pending_hedge_tracks_unhedged_remainder() {
        let mut agg = FillAggregator::new(18);
        agg.ingest(&fill(
            DedupKey::Wallet { order_hash: "0x1".into(), nonce: 0 },
            FillSource::WalletWs,
            10.0,
            0.45,
        ));
        assert_eq!(agg.pending_hedge(), 10.0);
        agg.record_hedge(4.0, 0.54).unwrap();
        assert_eq!(agg.pending_hedge(), 6.0);
        assert!((agg.avg_hedge_price() - 0.54).abs() < 1e-9);
    }

    #[test]
    fn rest_snapshot_never_decreases_rest_filled() {
        let mut agg = FillAggregator::new(18);
        assert!(agg.ingest_rest_snapshot(7.0, 0.45));
        assert_eq!(agg.effective_filled(), 7.0);
        assert!(!agg.ingest_rest_snapshot(5.0, 0.45));
        assert_eq!(agg.effective_filled(), 7.0);
        assert!(agg.ingest_rest_snapshot(9.0, 0.45));
        assert_eq!(agg.effective_filled(), 9.0);
    }
}
