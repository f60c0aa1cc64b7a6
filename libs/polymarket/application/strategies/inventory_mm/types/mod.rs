//! Types for the Inventory MM strategy.

pub mod input;
mod output;
mod order;

pub use input::{SolverInput, SolverConfig, OrderSnapshot, OpenOrder, InventorySnapshot, OrderbookSnapshot};
pub use output::{SolverOutput, ExecutorCommand};
pub use order::{Quote, LimitOrder, TakerOrder, Side, QuoteLadder};
