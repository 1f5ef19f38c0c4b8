//! # Phases
//!
//! Protocol phases of a per-cycle machine, in protocol order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol phase of one machine.
///
/// The derived ordering is the protocol order. A machine's phase never
/// decreases between update steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Created, nothing done yet.
    Start,
    /// Registered with the Tumbler; voucher received.
    Registration,
    /// Escrow channel opened.
    ChannelOpened,
    /// Promise received and opened (payee only).
    PromiseExchanged,
    /// Escrow confirmed on the ledger.
    EscrowConfirmed,
    /// Puzzle solution obtained.
    PuzzleSolved,
    /// Payment or cash-out transaction broadcast.
    PaymentBroadcast,
    /// Payment confirmed. Terminal.
    Success,
    /// Tumbler unreachable for the rest of the cycle. Terminal. No step
    /// produces it; an embedder marks it when it gives up on the server.
    Offline,
    /// A phase window closed before its precondition held. Terminal.
    Abandoned,
}

impl Phase {
    /// True if no further update can change the machine.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Success | Phase::Offline | Phase::Abandoned)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
