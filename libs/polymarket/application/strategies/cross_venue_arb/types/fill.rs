//! Fill events and the dedup keys that identify them across sources.

use num_bigint::BigUint;
use num_traits::Zero;

/// Which independent async source reported a fill.
///
/// Both sources observe the same underlying on-chain/wallet activity with
/// different latency and reliability characteristics, so the aggregator
/// must be able to tell them apart without trusting either exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillSource {
    WalletWs,
    ChainWs,
    RestReconcile,
}

/// Addressing scheme used to deduplicate a fill.
///
/// Wallet-channel fills are keyed by `(orderHash, nonce)`; chain-channel
/// fills are keyed by `(txHash, logIndex)`. The two schemes are never
/// comparable to each other, so they are kept in separate enum variants
/// rather than flattened into a shared tuple type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Chain { tx_hash: String, log_index: u64 },
    Wallet { order_hash: String, nonce: u64 },
}

/// A single normalized fill, regardless of which source produced it.
#[derive(Debug, Clone)]
pub struct FillEvent {
    pub key: DedupKey,
    pub source: FillSource,
    /// Filled size in base units (1e18-scaled on-chain amounts are parsed
    /// into this before any arithmetic, to avoid float precision loss).
    pub filled_base_units: BigUint,
    pub price: f64,
    pub observed_at_ms: u64,
}

impl FillEvent {
    pub fn filled_size(&self, decimals: u32) -> f64 {
        let scale = BigUint::from(10u64).pow(decimals);
        if scale.is_zero() {
            return 0.0;
        }
        // BigUint has no native float division; reduce to f64 via the
        // ratio of the two magnitudes, which is exact enough for
        // human-scale order sizes while keeping the summation itself
        // loss-free until this boundary.
        let numerator: f64 = self.filled_base_units.to_string().parse().unwrap_or(0.0);
        let denominator: f64 = scale.to_string().parse().unwrap_or(1.0);
        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}
