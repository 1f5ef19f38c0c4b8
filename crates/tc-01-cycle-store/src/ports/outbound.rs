//! # Outbound Ports (Driven Ports - SPI)
//!
//! The key/value engine underneath the record repository.

use crate::domain::StoreError;

/// Abstract interface for an ordered key/value engine.
///
/// Implementations must be thread-safe and return `prefix_scan` results in
/// ascending key order. Writes take `&self`; engines provide their own
/// interior synchronization.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Every pair whose key starts with `prefix`, ascending by key.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}
