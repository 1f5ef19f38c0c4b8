//! # SHA-2 Hashing
//!
//! One-shot SHA-512 (masking keystream) and SHA-256 (content hashes).

use sha2::{Digest, Sha256, Sha512};

/// SHA-512 output (512-bit).
pub type Sha512Hash = [u8; 64];

/// SHA-256 output (256-bit).
pub type Sha256Hash = [u8; 32];

/// Hash data with SHA-512.
pub fn sha512(data: &[u8]) -> Sha512Hash {
    let digest = Sha512::digest(data);
    let mut out = [0u8; 64];
    out.copy_from_slice(&digest);
    out
}

/// Hash data with SHA-256.
pub fn sha256(data: &[u8]) -> Sha256Hash {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha512_known_vector() {
        // SHA-512("abc")
        let hash = sha512(b"abc");
        assert_eq!(hash[..4], [0xdd, 0xaf, 0x35, 0xa1]);
        assert_eq!(hash[60..], [0xa5, 0x4c, 0xa4, 0x9f]);
    }

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256("abc")
        let hash = sha256(b"abc");
        assert_eq!(hash[..4], [0xba, 0x78, 0x16, 0xbf]);
    }

    #[test]
    fn test_different_inputs() {
        assert_ne!(sha512(b"input1"), sha512(b"input2"));
    }
}
