//! Data model shared across the task execution engine.

mod cost;
mod error;
mod fill;
mod orderbook;
mod task;

pub use cost::CostState;
pub use error::{TaskErrorKind, TaskResult};
pub use fill::{DedupKey, FillEvent, FillSource};
pub use orderbook::{Freshness, OrderBookSnapshot};
pub use task::{FillAggregatorState, IdempotencyIndex, Task, TaskParams, TaskStatus};
