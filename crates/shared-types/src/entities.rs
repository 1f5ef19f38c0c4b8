//! # Core Entities
//!
//! Ledger primitives and protocol participants.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger height (block number).
pub type Height = u32;

/// A 32-byte ledger hash.
pub type Hash = [u8; 32];

/// Hash of a ledger block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHash(#[serde(with = "hex::serde")] pub Hash);

impl BlockHash {
    /// The all-zero hash, used before any block has been observed.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// True for the all-zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Identifier of a ledger transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(#[serde(with = "hex::serde")] pub Hash);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Protocol role played by a per-cycle state machine.
///
/// The role is data on the machine state, not a separate machine type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Pays into the Tumbler and solves the puzzle ("Alice").
    Payer,
    /// Receives the promise and cashes out ("Bob").
    Payee,
}

impl Role {
    /// Both roles, payer first.
    pub const ALL: [Role; 2] = [Role::Payer, Role::Payee];

    /// Key disambiguating this role's record inside a cycle partition.
    pub fn record_key(&self) -> &'static str {
        match self {
            Role::Payer => "payer",
            Role::Payee => "payee",
        }
    }

    /// Network identity used when talking to the Tumbler for this role.
    pub fn identity(&self) -> Identity {
        match self {
            Role::Payer => Identity::Alice,
            Role::Payee => Identity::Bob,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_key())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payer" | "alice" => Ok(Role::Payer),
            "payee" | "bob" => Ok(Role::Payee),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Connection identity presented to the Tumbler.
///
/// Alice and Bob use distinct connection settings so the Tumbler cannot link
/// the two sides of a payment by network origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    /// Payer-side connection.
    Alice,
    /// Payee-side connection.
    Bob,
}

impl Identity {
    /// Pick an identity uniformly at random.
    pub fn random() -> Self {
        if rand::thread_rng().gen::<bool>() {
            Identity::Alice
        } else {
            Identity::Bob
        }
    }
}
