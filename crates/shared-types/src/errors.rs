//! # Error Types
//!
//! Errors raised while deriving cycles from published parameters.

use crate::entities::Height;
use thiserror::Error;

/// Errors from the cycle generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// Parameters cannot produce a well-formed cycle schedule.
    #[error("Invalid cycle parameters: {0}")]
    InvalidParameters(String),

    /// No cycle is accepting registrations at this height.
    #[error("No cycle is registering at height {height}")]
    NoRegisteringCycle { height: Height },

    /// The height is not the start of any cycle.
    #[error("Height {start} is not a cycle start")]
    NotACycleStart { start: Height },
}
