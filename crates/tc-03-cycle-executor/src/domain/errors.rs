//! # Domain Errors

use tc_01_cycle_store::StoreError;
use thiserror::Error;

/// Executor error types.
///
/// Machine failures never appear here; they are handled per machine inside a
/// tick. These errors abort the tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// Shutdown was requested. Not a failure.
    #[error("Executor cancelled")]
    Cancelled,

    /// The block source failed.
    #[error("Block source error: {0}")]
    BlockSource(String),

    /// The state store failed.
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}

impl ExecutorError {
    /// True for the clean shutdown path.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutorError::Cancelled)
    }
}
