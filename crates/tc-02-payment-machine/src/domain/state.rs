//! # Machine State
//!
//! The serializable snapshot of one role-machine's progress inside a cycle.
//! This is the value persisted under `Cycle_<start>/<role>`.

use crate::domain::phase::Phase;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_crypto::MaskingKey;
use shared_types::{Height, Role, TxId};

/// Promise opened with the payee's masking key.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedPromise {
    /// Candidate index named as real by the puzzle sub-protocol.
    pub slot: usize,
    /// Unmasked Tumbler signature.
    #[serde_as(as = "Hex")]
    pub signature: Vec<u8>,
}

/// Cryptographic artifacts accumulated so far.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifacts {
    /// Registration voucher issued by the Tumbler.
    #[serde_as(as = "Option<Hex>")]
    pub voucher: Option<Vec<u8>>,
    /// Promise key from the puzzle sub-protocol (payee). Never sent to the
    /// Tumbler.
    pub masking_key: Option<MaskingKey>,
    /// Escrow transaction of this machine's channel.
    pub escrow: Option<TxId>,
    /// Opened promise (payee).
    pub promise: Option<OpenedPromise>,
    /// Puzzle solution.
    #[serde_as(as = "Option<Hex>")]
    pub puzzle_solution: Option<Vec<u8>>,
    /// Cash-out destination (payee).
    pub destination: Option<String>,
    /// Payment or cash-out transaction.
    pub payment: Option<TxId>,
}

/// Persisted state of one machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    /// Start height of the owning cycle.
    pub cycle_start: Height,
    /// Role played in the cycle.
    pub role: Role,
    /// Current phase.
    pub phase: Phase,
    /// Artifacts accumulated so far.
    #[serde(default)]
    pub artifacts: Artifacts,
}

impl MachineState {
    /// Initial state: phase `Start`, no artifacts.
    pub fn new(cycle_start: Height, role: Role) -> Self {
        Self {
            cycle_start,
            role,
            phase: Phase::Start,
            artifacts: Artifacts::default(),
        }
    }

    /// Record key of this machine inside its cycle partition.
    pub fn record_key(&self) -> &'static str {
        self.role.record_key()
    }

    /// Same state moved to `phase`.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }
}
