//! # Domain Errors
//!
//! Failures of a single update step, and their classification for the
//! executor's tolerance policy.

use shared_crypto::CryptoError;
use shared_types::CycleError;
use std::fmt;
use thiserror::Error;

/// Error code reported by the Tumbler when it rejects a request.
///
/// The client maps the Tumbler's wire code explicitly instead of inspecting
/// message text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TumblerErrorCode {
    /// The Tumbler believes the cycle is in a different phase.
    InvalidPhase,
    /// The cycle is over on the Tumbler side.
    ExpiredCycle,
    /// The voucher was refused.
    InvalidVoucher,
    /// The request was malformed.
    InvalidRequest,
    /// Any code the client does not know.
    Unknown(String),
}

impl TumblerErrorCode {
    /// Map a wire code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "invalid-phase" => TumblerErrorCode::InvalidPhase,
            "expired-cycle" => TumblerErrorCode::ExpiredCycle,
            "invalid-voucher" => TumblerErrorCode::InvalidVoucher,
            "invalid-request" => TumblerErrorCode::InvalidRequest,
            other => TumblerErrorCode::Unknown(other.to_string()),
        }
    }

    /// Wire form of the code.
    pub fn as_str(&self) -> &str {
        match self {
            TumblerErrorCode::InvalidPhase => "invalid-phase",
            TumblerErrorCode::ExpiredCycle => "expired-cycle",
            TumblerErrorCode::InvalidVoucher => "invalid-voucher",
            TumblerErrorCode::InvalidRequest => "invalid-request",
            TumblerErrorCode::Unknown(code) => code,
        }
    }
}

impl fmt::Display for TumblerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// The Tumbler rejected a request with an explicit code.
    #[error("Tumbler rejected request ({code}): {message}")]
    Tumbler {
        /// Reported code
        code: TumblerErrorCode,
        /// Reported message
        message: String,
    },

    /// Transport to the Tumbler failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Block explorer query failed.
    #[error("Block explorer error: {0}")]
    Explorer(String),

    /// The candidate named as real did not open under the payee's key.
    #[error("Promise at slot {slot} did not open")]
    PromiseNotOpenable {
        /// Slot that was tried
        slot: usize,
    },

    /// The promise bundle is unusable.
    #[error("Invalid promise bundle: {0}")]
    InvalidPromiseBundle(String),

    /// Puzzle sub-protocol failure.
    #[error("Puzzle solver error: {0}")]
    Puzzle(String),

    /// Destination wallet failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// A previous phase should have produced this artifact.
    #[error("Missing artifact: {0}")]
    MissingArtifact(&'static str),

    /// Malformed key material.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The cycle cannot be derived from the Tumbler parameters.
    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),
}

impl MachineError {
    /// Build a Tumbler rejection from its wire code.
    pub fn tumbler(code: &str, message: impl Into<String>) -> Self {
        MachineError::Tumbler {
            code: TumblerErrorCode::from_code(code),
            message: message.into(),
        }
    }

    /// True for the expected, self-healing failures: a remote phase mismatch
    /// and a promise that did not open yet. Everything else is fatal to the
    /// step.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MachineError::Tumbler {
                code: TumblerErrorCode::InvalidPhase,
                ..
            } | MachineError::PromiseNotOpenable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        assert_eq!(
            TumblerErrorCode::from_code("invalid-phase"),
            TumblerErrorCode::InvalidPhase
        );
        assert_eq!(
            TumblerErrorCode::from_code("teapot"),
            TumblerErrorCode::Unknown("teapot".to_string())
        );
        assert_eq!(TumblerErrorCode::ExpiredCycle.as_str(), "expired-cycle");
    }

    #[test]
    fn test_only_phase_mismatch_and_unopened_promise_are_transient() {
        assert!(MachineError::tumbler("invalid-phase", "").is_transient());
        assert!(MachineError::PromiseNotOpenable { slot: 1 }.is_transient());

        assert!(!MachineError::tumbler("expired-cycle", "").is_transient());
        assert!(!MachineError::Transport("invalid-phase".to_string()).is_transient());
        assert!(!MachineError::InvalidPromiseBundle("empty".to_string()).is_transient());
        assert!(!MachineError::MissingArtifact("voucher").is_transient());
    }
}
