//! # Ports
//!
//! Outbound dependencies of the cycle state store.

pub mod outbound;

pub use outbound::*;
