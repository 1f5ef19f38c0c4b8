//! # Ports
//!
//! The ledger collaborator that paces the executor.

pub mod outbound;

pub use outbound::*;
