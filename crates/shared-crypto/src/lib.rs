//! # Shared Crypto
//!
//! Cryptographic primitives used by the tumbler client.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `masking` | SHA-512 keystream XOR | Hiding the real promise among decoys |
//! | `hashing` | SHA-512, SHA-256 | Keystream derivation, content hashes |
//!
//! ## Security Properties
//!
//! - **Masking**: one-time pad per key; the key's byte form is fixed at 256
//!   bytes before hashing so distinct keys never collide on representation
//! - **Construction errors** are raised before any operation touches the input

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod masking;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{sha256, sha512, Sha256Hash, Sha512Hash};
pub use masking::{decoy, mask, MaskingKey, KEYSTREAM_SIZE, KEY_SIZE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
