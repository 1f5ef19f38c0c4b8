//! # Ports
//!
//! External collaborators consumed by the payment machine.

pub mod outbound;

pub use outbound::*;
