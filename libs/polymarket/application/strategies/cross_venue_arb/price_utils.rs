//! Price and cost arithmetic shared by cost guard, hedge executor and
//! order lifecycle.
//!
//! Key formula: total_cost = ask_primary + ask_hedge + fee(ask_primary) —
//! the fee is charged once, on the primary-side fill, not on the hedge
//! leg — and a task stays profitable for as long as that total sits at
//! or below its configured `max_cost`.

const EPSILON: f64 = 1e-9;

/// Round a price down to the nearest multiple of `tick`.
pub fn align_down(price: f64, tick: f64) -> f64 {
    if tick <= 0.0 {
        return price;
    }
    (price / tick).floor() * tick
}

/// Round a price up to the nearest multiple of `tick`.
pub fn align_up(price: f64, tick: f64) -> f64 {
    if tick <= 0.0 {
        return price;
    }
    (price / tick).ceil() * tick
}

/// Round a price to the nearest multiple of `tick`.
pub fn round_to_tick(price: f64, tick: f64) -> f64 {
    if tick <= 0.0 {
        return price;
    }
    (price / tick).round() * tick
}

/// Per-share fee charged on a fill at `price`, as `fee_rate_bps` basis
/// points of the price.
pub fn fee(price: f64, fee_rate_bps: u32) -> f64 {
    price * fee_rate_bps as f64 / 10_000.0
}

/// Total round-trip cost of the combined primary+hedge position: the two
/// asks plus the fee on the primary-side fill only.
pub fn total_cost(ask_primary: f64, ask_hedge: f64, fee_rate_bps: u32) -> f64 {
    ask_primary + ask_hedge + fee(ask_primary, fee_rate_bps)
}

/// Whether `total_cost` still clears the task's configured `max_cost`,
/// within floating-point tolerance.
pub fn is_cost_valid(total_cost: f64, max_cost: f64) -> bool {
    total_cost <= max_cost + EPSILON
}

/// The hedge-venue ask price above which the opportunity would no longer
/// clear, given a fixed primary-side ask already paid and a task's
/// `max_cost` ceiling. `None` if the primary fill alone (plus its fee)
/// already consumes the whole budget.
pub fn max_hedge_ask(ask_primary: f64, max_cost: f64, fee_rate_bps: u32) -> Option<f64> {
    let bound = max_cost - ask_primary - fee(ask_primary, fee_rate_bps);
    if bound > 0.0 {
        Some(bound)
    } else {
        None
    }
}

/// Venue price-domain validity: binary-outcome prices are quoted in
/// `[0.01, 0.99]`.
pub fn is_valid_price(price: f64) -> bool {
    (0.01 - EPSILON..=0.99 + EPSILON).contains(&price)
}

/// Floor a share quantity to the smallest unit the venue will accept.
/// Hedge legs are sized off accumulated fills, which can carry float
/// slop; flooring here (rather than at the call site) keeps that one
/// rule in one place.
pub fn floor_quantity(quantity: f64, lot_size: f64) -> f64 {
    if quantity <= 0.0 {
        return 0.0;
    }
    if lot_size <= 0.0 {
        return quantity;
    }
    (quantity / lot_size).floor() * lot_size
}

/// Weighted-average price after folding in a new fill of `add_size` at
/// `add_price` onto an existing position of `prior_size` at
/// `prior_avg_price`.
pub fn weighted_avg_after_fill(
    prior_avg_price: f64,
    prior_size: f64,
    add_price: f64,
    add_size: f64,
) -> f64 {
    let total_size = prior_size + add_size;
    if total_size <= 0.0 {
        return 0.0;
    }
    (prior_avg_price * prior_size + add_price * add_size) / total_size
}

/// Two prices are considered equal for self-trade / duplicate-quote
/// prevention purposes within this epsilon.
pub const PRICE_EPSILON: f64 = 1e-4;

pub fn prices_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < PRICE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_down_rounds_toward_zero_tick() {
        assert_eq!(align_down(0.457, 0.01), 0.45);
        assert_eq!(align_up(0.453, 0.01), 0.46);
        assert_eq!(round_to_tick(0.455, 0.01), 0.46);
    }

    #[test]
    fn total_cost_matches_scenario_s1() {
        // askP=0.45, askH=0.54, fee=2% of 0.45=0.009 -> cost=0.999 <= 1.000
        let cost = total_cost(0.45, 0.54, 200);
        assert!((cost - 0.999).abs() < 1e-9);
        assert!(is_cost_valid(cost, 1.000));
    }

    #[test]
    fn cost_invalid_when_hedge_ask_rises() {
        // S2: hedge ask climbs from 0.54 to 0.56, cost now exceeds maxCost.
        let cost = total_cost(0.45, 0.56, 200);
        assert!((cost - 1.019).abs() < 1e-9);
        assert!(!is_cost_valid(cost, 1.000));
    }

    #[test]
    fn max_hedge_ask_matches_scenario_s1() {
        // maxCost=1.000, askP=0.45, fee=0.009 -> bound=0.541
        let bound = max_hedge_ask(0.45, 1.000, 200).unwrap();
        assert!((bound - 0.541).abs() < 1e-9);
    }

    #[test]
    fn max_hedge_ask_fails_when_primary_leg_exhausts_budget() {
        assert!(max_hedge_ask(0.99, 1.000, 200).is_none());
    }

    #[test]
    fn price_range_validity() {
        assert!(is_valid_price(0.01));
        assert!(is_valid_price(0.99));
        assert!(is_valid_price(0.45));
        assert!(!is_valid_price(0.0));
        assert!(!is_valid_price(1.0));
    }

    #[test]
    fn floor_quantity_respects_lot_size() {
        assert_eq!(floor_quantity(10.7, 1.0), 10.0);
        assert_eq!(floor_quantity(10.7, 0.1), 10.7);
        assert_eq!(floor_quantity(-1.0, 1.0), 0.0);
    }

    #[test]
    fn weighted_avg_folds_new_fill() {
        let avg = weighted_avg_after_fill(0.45, 4.0, 0.46, 6.0);
        assert!((avg - 0.456).abs() < 1e-9);
    }

    #[test]
    fn price_epsilon_treats_near_equal_as_equal() {
        assert!(prices_equal(0.4500, 0.45005));
        assert!(!prices_equal(0.45, 0.4502));
    }
}
