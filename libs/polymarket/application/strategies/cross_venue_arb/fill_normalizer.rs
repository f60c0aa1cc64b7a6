//! Normalizes raw wallet/chain messages into canonical `FillEvent`s.
//!
//! Wallet and chain sources report amounts in different native
//! representations (decimal strings vs. 1e18-scaled base-unit integers).
//! Everything is parsed through `num_bigint::BigUint` here so a later sum
//! never silently loses precision the way an `f64` accumulation would.

use super::types::{DedupKey, FillEvent, FillSource};
use num_bigint::BigUint;
use num_traits::Num;

/// Raw trade payload from the wallet WebSocket channel.
#[derive(Debug, Clone)]
pub struct WalletTradeRaw {
    pub order_hash: String,
    pub nonce: u64,
    pub price: f64,
    /// Decimal size, e.g. "12.5".
    pub size: String,
    pub timestamp_ms: u64,
}

/// Raw settlement log from the chain WebSocket channel.
#[derive(Debug, Clone)]
pub struct ChainLogRaw {
    pub tx_hash: String,
    pub log_index: u64,
    pub price: f64,
    /// Hex or decimal 1e18-scaled base-unit amount.
    pub amount_base_units: String,
    pub timestamp_ms: u64,
}

pub fn normalize_wallet_fill(raw: &WalletTradeRaw) -> Option<FillEvent> {
    let size: f64 = raw.size.parse().ok()?;
    let base_units = decimal_to_base_units(size, 18)?;

    Some(FillEvent {
        key: DedupKey::Wallet {
            order_hash: raw.order_hash.clone(),
            nonce: raw.nonce,
        },
        source: FillSource::WalletWs,
        filled_base_units: base_units,
        price: raw.price,
        observed_at_ms: raw.timestamp_ms,
    })
}

pub fn normalize_chain_fill(raw: &ChainLogRaw) -> Option<FillEvent> {
    let base_units = parse_base_units(&raw.amount_base_units)?;

    Some(FillEvent {
        key: DedupKey::Chain {
            tx_hash: raw.tx_hash.clone(),
            log_index: raw.log_index,
        },
        source: FillSource::ChainWs,
        filled_base_units: base_units,
        price: raw.price,
        observed_at_ms: raw.timestamp_ms,
    })
}

fn parse_base_units(s: &str) -> Option<BigUint> {
    if let Some(hex) = s.strip_prefix("0x") {
        BigUint::from_str_radix(hex, 16).ok()
    } else {
        BigUint::from_str_radix(s, 10).ok()
    }
}

fn decimal_to_base_units(value: f64, decimals: u32) -> Option<BigUint> {
    if value < 0.0 || !value.is_finite() {
        return None;
    }
    let scaled = (value * 10f64.powi(decimals as i32)).round();
    if scaled < 0.0 || !scaled.is_finite() {
        return None;
    }
    BigUint::from_str_radix(&format!("{:.0}", scaled), 10).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_fill_round_trips_decimal_size() {
        let raw = WalletTradeRaw {
            order_hash: "0xabc".into(),
            nonce: 1,
            price: 0.45,
            size: "10.5".into(),
            timestamp_ms: 1000,
        };
        let fill = normalize_wallet_fill(&raw).unwrap();
        assert_eq!(fill.filled_size(18), 10.5);
        assert!(matches!(fill.key, DedupKey::Wallet { nonce: 1, .. }));
    }

    #[test]
    fn chain_fill_parses_hex_base_units() {
        let raw = ChainLogRaw {
            tx_hash: "0xdef".into(),
            log_index: 3,
            price: 0.45,
            amount_base_units: "0x8ac7230489e80000".into(), // 10 * 1e18
            timestamp_ms: 1000,
        };
        let fill = normalize_chain_fill(&raw).unwrap();
        assert!((fill.filled_size(18) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn malformed_size_is_rejected_not_defaulted() {
        let raw = WalletTradeRaw {
            order_hash: "0xabc".into(),
            nonce: 1,
            price: 0.45,
            size: "not-a-number".into(),
            timestamp_ms: 1000,
        };
        assert!(normalize_wallet_fill(&raw).is_none());
    }
}
