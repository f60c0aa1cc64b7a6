//! Executor - separate thread for order execution.

mod executor;
mod commands;

pub use executor::{Executor, ExecutorHandle, QuoterExecutorHandle, ExecutorError};
pub use commands::{ExecutorCommand, ExecutorResult};
