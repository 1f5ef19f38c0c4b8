//! # Step Outcome
//!
//! Result of one update step. The executor switches on the tag; the state to
//! persist is carried by every variant.

use crate::domain::errors::MachineError;
use crate::domain::state::MachineState;

/// Outcome of `PaymentStateMachine::update`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The machine moved to a later phase.
    Advanced(MachineState),
    /// Preconditions not met yet; state unchanged.
    NoOp(MachineState),
    /// The remote view of the cycle differs from ours; retry next block.
    TransientPhaseMismatch {
        /// Unchanged input state
        state: MachineState,
        /// Cause
        error: MachineError,
    },
    /// The step failed for any other reason.
    Fatal {
        /// Unchanged input state
        state: MachineState,
        /// Cause
        error: MachineError,
    },
}

impl StepOutcome {
    /// Classify a failed step.
    pub fn failed(state: MachineState, error: MachineError) -> Self {
        if error.is_transient() {
            StepOutcome::TransientPhaseMismatch { state, error }
        } else {
            StepOutcome::Fatal { state, error }
        }
    }

    /// State to persist after this step.
    pub fn state(&self) -> &MachineState {
        match self {
            StepOutcome::Advanced(state) | StepOutcome::NoOp(state) => state,
            StepOutcome::TransientPhaseMismatch { state, .. } | StepOutcome::Fatal { state, .. } => {
                state
            }
        }
    }

    /// Consume the outcome, keeping the state to persist.
    pub fn into_state(self) -> MachineState {
        match self {
            StepOutcome::Advanced(state) | StepOutcome::NoOp(state) => state,
            StepOutcome::TransientPhaseMismatch { state, .. } | StepOutcome::Fatal { state, .. } => {
                state
            }
        }
    }
}
