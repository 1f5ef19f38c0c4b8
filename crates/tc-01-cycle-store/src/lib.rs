//! # Cycle State Store (Subsystem tc-01)
//!
//! Durable, partitioned storage for the client's protocol state.
//!
//! ## Architecture
//!
//! ```text
//! CycleStateStore ──▶ Repository ──▶ dyn KeyValueStore
//!  (Cycle_<N>/<role>)   (JSON records)   ├── InMemoryKvStore
//!                                        └── RocksDbStore   (feature "rocksdb")
//! ```
//!
//! ## Guarantees
//!
//! - Creation is idempotent: an existing record is never replaced by
//!   `create_if_absent`.
//! - Saves are last-write-wins.
//! - Records are isolated per cycle partition; listing one cycle never
//!   returns another cycle's records.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod repository;
pub mod service;

pub use adapters::InMemoryKvStore;
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::{cycle_partition, StoreError, CONFIGURATION_PARTITION};
pub use ports::KeyValueStore;
pub use repository::Repository;
pub use service::CycleStateStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
