//! Crypto error types.

use thiserror::Error;

/// Cryptographic construction errors.
///
/// Raised before any cryptographic operation runs on the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Key value does not fit the fixed key width
    #[error("Key value out of range: {bits} bits")]
    KeyOutOfRange {
        /// Bit length of the rejected value
        bits: u64,
    },
}
