//! Cost-guard state: the live vs. derived price signals for a task.

/// Snapshot of the hedge-cost validity check for one task.
///
/// `max_ask_h` and `max_cost` are computed once at task creation and
/// never recomputed — they are the static bounds the opportunity was
/// sized against. `total_cost` is recomputed every poll from the live
/// hedge-venue book and is the signal that actually trips `CostInvalid`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostState {
    pub max_cost: f64,
    pub max_ask_h: f64,
    pub total_cost: f64,
    pub fee_rate_bps: u32,
}

impl CostState {
    pub fn is_valid(&self) -> bool {
        super::super::price_utils::is_cost_valid(self.total_cost, self.max_cost)
    }
}
