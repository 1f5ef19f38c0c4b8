//! # Promise Masking
//!
//! Keyed XOR masking used by the promise phase to hide a signed payload among
//! decoys.
//!
//! ## Construction
//!
//! ```text
//! key bytes   = big-endian(key), left-zero-padded to 256 bytes
//! keystream   = SHA-512(key bytes)                      (64 bytes)
//! out[i]      = payload[i] XOR keystream[i mod 64]
//! ```
//!
//! Masking is its own inverse. The fixed 256-byte hash input means two
//! distinct keys never share a byte representation.
//!
//! ## Single use
//!
//! A key masks exactly one real payload. Masking two payloads with the same
//! key leaks their XOR.

use crate::errors::CryptoError;
use crate::hashing::{sha512, Sha512Hash};
use num_bigint::BigUint;
use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Size in bytes of a masking key's canonical representation.
pub const KEY_SIZE: usize = 256;

/// Size in bytes of the keystream derived from one key.
pub const KEYSTREAM_SIZE: usize = 64;

/// Single-use masking key: a non-negative integer below 2^2048.
#[derive(Clone, PartialEq, Eq)]
pub struct MaskingKey {
    value: BigUint,
}

impl MaskingKey {
    /// Build a key from its raw 256-byte big-endian representation.
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidKeyLength` if `key` is not exactly 256 bytes.
    /// Short input is rejected, never padded.
    pub fn from_bytes(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: key.len(),
            });
        }
        Ok(Self {
            value: BigUint::from_bytes_be(key),
        })
    }

    /// Build a key from its canonical 256-byte representation.
    pub fn from_array(key: [u8; KEY_SIZE]) -> Self {
        Self {
            value: BigUint::from_bytes_be(&key),
        }
    }

    /// Wrap an integer value.
    ///
    /// # Errors
    ///
    /// `CryptoError::KeyOutOfRange` if the value needs more than 2048 bits.
    pub fn from_value(value: BigUint) -> Result<Self, CryptoError> {
        let bits = value.bits();
        if bits > (KEY_SIZE * 8) as u64 {
            return Err(CryptoError::KeyOutOfRange { bits });
        }
        Ok(Self { value })
    }

    /// Draw a fresh key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_array(bytes)
    }

    /// Integer value of the key.
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Canonical representation: big-endian, left-zero-padded to 256 bytes.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        let mut out = [0u8; KEY_SIZE];
        let raw = self.value.to_bytes_be();
        // to_bytes_be() yields [0] for zero; the padding already covers it.
        let significant = raw.iter().skip_while(|b| **b == 0).count();
        out[KEY_SIZE - significant..].copy_from_slice(&raw[raw.len() - significant..]);
        out
    }

    /// Keystream derived from this key.
    pub fn keystream(&self) -> Sha512Hash {
        sha512(&self.to_bytes())
    }

    /// Mask (or unmask) `payload`. The keystream wraps for long payloads.
    pub fn mask(&self, payload: &[u8]) -> Vec<u8> {
        let keystream = self.keystream();
        payload
            .iter()
            .zip(keystream.iter().cycle())
            .map(|(p, k)| p ^ k)
            .collect()
    }
}

/// Mask `payload` under `key`. Applying it twice returns the payload.
pub fn mask(key: &MaskingKey, payload: &[u8]) -> Vec<u8> {
    key.mask(payload)
}

/// A decoy ciphertext of `len` bytes.
///
/// Decoys are random payloads masked under a fresh throwaway key, so they are
/// indistinguishable from a real masked payload of the same length.
pub fn decoy(len: usize) -> Vec<u8> {
    let mut payload = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut payload);
    MaskingKey::generate().mask(&payload)
}

impl fmt::Debug for MaskingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MaskingKey(..)")
    }
}

impl Serialize for MaskingKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for MaskingKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(de::Error::custom)?;
        MaskingKey::from_bytes(&bytes).map_err(de::Error::custom)
    }
}
