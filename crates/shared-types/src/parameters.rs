//! # Tumbler Parameters
//!
//! Parameters published by the Tumbler. A client pins them by hash: the last
//! path segment of the Tumbler's URL carries the expected parameter hash, so a
//! server cannot silently change denomination, fee or cycle schedule.

use crate::cycle::CycleGenerator;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of the canonical parameter serialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterHash(#[serde(with = "hex::serde")] pub [u8; 32]);

impl ParameterHash {
    /// Parse a 64-character hex string.
    pub fn from_hex(value: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(value, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for ParameterHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Parameters published by a Tumbler server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TumblerParameters {
    /// Ledger network name (e.g. "testnet").
    pub network: String,
    /// Amount moved per payment, in base units.
    pub denomination: u64,
    /// Tumbler fee per payment, in base units.
    pub fee: u64,
    /// Cycle schedule.
    pub cycle_generator: CycleGenerator,
    /// Number of real puzzles in the cut-and-choose step.
    pub real_puzzle_count: u32,
    /// Number of fake puzzles in the cut-and-choose step.
    pub fake_puzzle_count: u32,
    /// Tumbler's public key material, hex encoded.
    pub server_key: String,
}

impl TumblerParameters {
    /// Content hash over the canonical JSON serialization.
    pub fn hash(&self) -> ParameterHash {
        // Struct field order is fixed, so the JSON encoding is canonical.
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&encoded);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        ParameterHash(out)
    }

    /// Extract the expected parameter hash from a Tumbler URL.
    ///
    /// The hash is the last non-empty path segment, ignoring query string and
    /// fragment: `http://host/api/v1/tumblers/<hash>`.
    pub fn extract_hash_from_url(url: &str) -> Option<ParameterHash> {
        let without_fragment = url.split('#').next()?;
        let path = without_fragment.split('?').next()?;
        let segment = path.split('/').rev().find(|s| !s.is_empty())?;
        ParameterHash::from_hex(segment)
    }
}
