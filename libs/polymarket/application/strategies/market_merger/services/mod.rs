//! Services for the Market Merger strategy

mod quote_calculator;
mod size_calculator;
mod opportunity_scanner;
mod merge_checker;

pub use quote_calculator::QuoteCalculator;
pub use size_calculator::SizeCalculator;
pub use opportunity_scanner::OpportunityScanner;
pub use merge_checker::{MergeChecker, MergeDecision};
