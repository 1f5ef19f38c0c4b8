//! # Domain Errors
//!
//! Error types for the cycle state store.

use thiserror::Error;

/// Store error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// I/O error in the underlying key/value engine.
    #[error("KV store I/O error: {message}")]
    Io {
        /// Engine-reported message
        message: String,
    },

    /// Stored bytes could not be decoded.
    #[error("Corrupt record {partition}/{key}: {message}")]
    Corruption {
        /// Partition of the record
        partition: String,
        /// Key of the record
        key: String,
        /// Decoder message
        message: String,
    },

    /// Value could not be encoded.
    #[error("Failed to encode record {partition}/{key}: {message}")]
    Encoding {
        /// Partition of the record
        partition: String,
        /// Key of the record
        key: String,
        /// Encoder message
        message: String,
    },

    /// Partition name is empty or contains the separator.
    #[error("Invalid partition name: {0:?}")]
    InvalidPartition(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corruption_error_names_record() {
        let err = StoreError::Corruption {
            partition: "Cycle_100".to_string(),
            key: "payer".to_string(),
            message: "expected value".to_string(),
        };
        assert!(err.to_string().contains("Cycle_100/payer"));
    }
}
