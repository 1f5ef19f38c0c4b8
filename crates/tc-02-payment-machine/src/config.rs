//! # Machine Configuration

use serde::{Deserialize, Serialize};

/// Payment machine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Confirmations required before an escrow counts as confirmed.
    pub escrow_confirmations: u32,

    /// Confirmations required before a payment counts as final.
    pub payment_confirmations: u32,

    /// Upper bound on the number of promise candidates accepted from the
    /// Tumbler. The Tumbler decides the count; the client only bounds it.
    pub max_promise_candidates: usize,

    /// Ask the Tumbler to co-sign the payee's cash-out instead of claiming
    /// the escrow unilaterally.
    pub cooperative: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            escrow_confirmations: 1,
            payment_confirmations: 1,
            max_promise_candidates: 300,
            cooperative: true,
        }
    }
}

impl MachineConfig {
    /// Create a config for testing.
    pub fn for_testing() -> Self {
        Self {
            max_promise_candidates: 16,
            ..Self::default()
        }
    }
}
