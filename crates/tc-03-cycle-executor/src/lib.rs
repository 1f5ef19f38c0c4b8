//! # Cycle Executor (Subsystem tc-03)
//!
//! The block-driven scheduler for per-cycle payment state machines.
//!
//! ## Architecture
//!
//! ```text
//!  BlockSource ──new block──▶ StateMachinesExecutor ──update──▶ PaymentStateMachine
//!                                   │        ▲
//!                              save │        │ list
//!                                   ▼        │
//!                               CycleStateStore (Cycle_<N>/<role>)
//! ```
//!
//! ## Guarantees
//!
//! - One worker; it is the sole writer of machine state.
//! - A machine's update completes and is persisted before it is next loaded.
//! - Machine failures never escape the tick; tick failures never end the
//!   loop. Only the shutdown signal does.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod shutdown;

pub use config::{BackoffPolicy, ExecutorConfig};
pub use domain::*;
pub use ports::*;
pub use service::StateMachinesExecutor;
pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownSignal};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
