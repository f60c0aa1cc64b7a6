//! Property-based tests for the cross-venue arbitrage task execution
//! engine's core invariants.
//!
//! Run with: cargo test -p polymarket cross_venue_arb_properties --release

use num_bigint::BigUint;
use polymarket::application::strategies::cross_venue_arb::price_utils::{
    is_cost_valid, max_hedge_ask, total_cost,
};
use polymarket::application::strategies::cross_venue_arb::types::{
    DedupKey, FillAggregatorState, FillEvent, FillSource,
};
use proptest::prelude::*;

fn fill_event(key: DedupKey, source: FillSource, size: f64, price: f64) -> FillEvent {
    FillEvent {
        key,
        source,
        filled_base_units: BigUint::from((size.max(0.0) * 1e6) as u128),
        price,
        observed_at_ms: 0,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// P1: effective_filled never decreases as more fills are folded in,
    /// regardless of delivery order or which source reported them.
    #[test]
    fn effective_filled_is_monotonic(
        sizes in prop::collection::vec(0.0..1000.0f64, 1..20),
        from_wallet in prop::collection::vec(any::<bool>(), 1..20),
    ) {
        let mut state = FillAggregatorState::default();
        let mut previous = 0.0;

        for (i, size) in sizes.iter().enumerate() {
            let source = if from_wallet.get(i).copied().unwrap_or(true) {
                FillSource::WalletWs
            } else {
                FillSource::ChainWs
            };
            let key = if source == FillSource::WalletWs {
                DedupKey::Wallet { order_hash: format!("0x{}", i), nonce: i as u64 }
            } else {
                DedupKey::Chain { tx_hash: format!("0x{}", i), log_index: i as u64 }
            };
            let event = fill_event(key, source, *size, 0.5);
            let fill_size = event.filled_size(6);
            state.ingest(&event, fill_size);

            prop_assert!(state.effective_filled >= previous - 1e-9);
            previous = state.effective_filled;
        }
    }

    /// P2: re-delivering the exact same dedup key is a no-op, however
    /// many times it happens.
    #[test]
    fn duplicate_delivery_is_idempotent(size in 0.1..1000.0f64, repeats in 1usize..10) {
        let mut state = FillAggregatorState::default();
        let key = DedupKey::Wallet { order_hash: "0xabc".into(), nonce: 7 };
        let event = fill_event(key, FillSource::WalletWs, size, 0.5);

        for _ in 0..repeats {
            state.ingest(&event, size);
        }

        prop_assert!((state.effective_filled - size).abs() < 1e-6);
    }

    /// P3: the merged total is always the max of the two sources' running
    /// totals, never their sum.
    #[test]
    fn merge_takes_max_not_sum(wallet_total in 0.0..1000.0f64, chain_total in 0.0..1000.0f64) {
        let mut state = FillAggregatorState::default();
        let wallet_event = fill_event(
            DedupKey::Wallet { order_hash: "0x1".into(), nonce: 0 },
            FillSource::WalletWs,
            wallet_total,
            0.5,
        );
        let chain_event = fill_event(
            DedupKey::Chain { tx_hash: "0x1".into(), log_index: 0 },
            FillSource::ChainWs,
            chain_total,
            0.5,
        );
        state.ingest(&wallet_event, wallet_total);
        state.ingest(&chain_event, chain_total);

        let expected = wallet_total.max(chain_total);
        prop_assert!((state.effective_filled - expected).abs() < 1e-6);
        prop_assert!(state.effective_filled <= wallet_total + chain_total + 1e-6);
    }

    /// P6: cost validity is a pure function of total cost against the
    /// configured ceiling — it flips exactly at the boundary, never
    /// earlier or later due to floating-point slop beyond the guard's
    /// own epsilon.
    #[test]
    fn cost_validity_tracks_total_cost_boundary(
        ask_primary in 0.01..0.99f64,
        ask_hedge in 0.01..0.99f64,
        fee_bps in 0u32..500u32,
        max_cost in 0.5..1.5f64,
    ) {
        let cost = total_cost(ask_primary, ask_hedge, fee_bps);
        let valid = is_cost_valid(cost, max_cost);
        prop_assert_eq!(valid, cost <= max_cost + 1e-9);
    }

    /// `maxAskH` ceiling: whatever `maxAskH` is derived for a given
    /// `(askP, maxCost, fee)` triple, paying exactly that much on H never
    /// produces a total cost above `maxCost` (up to the shared epsilon) —
    /// the hedge bound is a tight, not approximate, ceiling.
    #[test]
    fn max_ask_h_bound_never_exceeds_max_cost(
        ask_primary in 0.01..0.99f64,
        max_cost in 0.5..2.0f64,
        fee_bps in 0u32..500u32,
    ) {
        if let Some(bound) = max_hedge_ask(ask_primary, max_cost, fee_bps) {
            let cost_at_bound = total_cost(ask_primary, bound, fee_bps);
            prop_assert!(cost_at_bound <= max_cost + 1e-9);
        }
    }

    /// P4/I2: no matter how fills and hedge fills interleave, `record_hedge`
    /// never lets `total_hedged` run ahead of `effective_filled` — hedge
    /// attempts that would overshoot are rejected rather than silently
    /// clamped.
    #[test]
    fn total_hedged_never_exceeds_effective_filled(
        fill_sizes in prop::collection::vec(0.1..100.0f64, 1..10),
        hedge_attempts in prop::collection::vec(0.1..50.0f64, 1..15),
    ) {
        let mut state = FillAggregatorState::default();
        for (i, size) in fill_sizes.iter().enumerate() {
            let event = fill_event(
                DedupKey::Wallet { order_hash: format!("0x{}", i), nonce: i as u64 },
                FillSource::WalletWs,
                *size,
                0.5,
            );
            let fill_size = event.filled_size(6);
            state.ingest(&event, fill_size);
        }

        for qty in hedge_attempts {
            let _ = state.record_hedge(qty, 0.5);
            prop_assert!(state.total_hedged <= state.effective_filled + 1e-6);
        }
    }
}
