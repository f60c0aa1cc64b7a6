//! Error taxonomy for the task execution engine.

use thiserror::Error;

/// The full set of reasons a task can fail or be wound down.
///
/// Every non-success terminal state carries exactly one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskErrorKind {
    #[error("invalid task parameters: {0}")]
    InvalidParams(String),

    #[error("transient network error: {0}")]
    TransientNet(String),

    #[error("permanent venue error: {0}")]
    PermanentVenue(String),

    #[error("hedge cost no longer valid")]
    CostInvalid,

    #[error("order timed out before filling")]
    OrderTimeout,

    #[error("hedge venue rejected price")]
    HedgePriceRejected,

    #[error("cancelled by user")]
    UserCancelled,

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    #[error("unhedged residual of {0} shares after repeated hedge failures")]
    HedgeResidual(f64),
}

impl TaskErrorKind {
    /// Whether the caller should retry the operation that produced this
    /// error, as opposed to treating the task as terminally failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskErrorKind::TransientNet(_))
    }
}

pub type TaskResult<T> = Result<T, TaskErrorKind>;
