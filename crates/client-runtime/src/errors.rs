//! # Runtime Errors

use shared_types::{CycleError, ParameterHash};
use tc_01_cycle_store::StoreError;
use tc_02_payment_machine::MachineError;
use thiserror::Error;
use tumbler_telemetry::TelemetryError;

/// Runtime bootstrap errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every download attempt failed.
    #[error("Failed to download Tumbler parameters after {} attempts: {}", .errors.len(), join(.errors))]
    ParameterDownload {
        /// Error of each attempt, in order
        errors: Vec<MachineError>,
    },

    /// The user refused the downloaded parameters.
    #[error("Tumbler parameters refused")]
    ParametersRefused,

    /// The parameters do not match the hash pinned in the server URL.
    #[error("Tumbler parameters hash {actual} does not match expected {expected}")]
    ParameterHashMismatch {
        /// Hash from the server URL
        expected: ParameterHash,
        /// Hash of the received parameters
        actual: ParameterHash,
    },

    /// No parameters are available to derive cycles from.
    #[error("Tumbler parameters not available")]
    MissingParameters,

    /// The published cycle schedule is malformed.
    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),

    /// The state store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Logging could not be installed.
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

fn join(errors: &[MachineError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
