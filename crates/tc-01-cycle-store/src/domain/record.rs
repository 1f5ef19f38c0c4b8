//! # Record Layout
//!
//! The durable layout other tooling may read for monitoring:
//!
//! ```text
//! <partition> '/' <key>  →  JSON-encoded value
//!
//! Cycle_<start>/payer    →  payer machine state for the cycle starting at <start>
//! Cycle_<start>/payee    →  payee machine state
//! Configuration/<url>    →  cached Tumbler parameters
//! ```

use shared_types::Height;

/// Separator between partition and key in the engine key space.
pub const PARTITION_SEPARATOR: u8 = b'/';

/// Partition holding cached Tumbler parameters.
pub const CONFIGURATION_PARTITION: &str = "Configuration";

/// Common prefix of every cycle partition.
pub const CYCLE_PARTITION_PREFIX: &str = "Cycle_";

/// Partition holding every machine state of one cycle.
pub fn cycle_partition(cycle_start: Height) -> String {
    format!("{}{}", CYCLE_PARTITION_PREFIX, cycle_start)
}

/// Cycle start encoded in a cycle partition name.
pub fn parse_cycle_partition(partition: &str) -> Option<Height> {
    partition.strip_prefix(CYCLE_PARTITION_PREFIX)?.parse().ok()
}

/// Engine key for a record: `partition/key`.
pub fn record_key(partition: &str, key: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(partition.len() + 1 + key.len());
    out.extend_from_slice(partition.as_bytes());
    out.push(PARTITION_SEPARATOR);
    out.extend_from_slice(key.as_bytes());
    out
}

/// Engine prefix covering every record of a partition.
pub fn partition_prefix(partition: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(partition.len() + 1);
    out.extend_from_slice(partition.as_bytes());
    out.push(PARTITION_SEPARATOR);
    out
}

/// True if the name can be used as a partition.
pub fn is_valid_partition(partition: &str) -> bool {
    !partition.is_empty() && !partition.as_bytes().contains(&PARTITION_SEPARATOR)
}
