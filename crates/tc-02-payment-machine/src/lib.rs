//! # Payment State Machine (Subsystem tc-02)
//!
//! The phase protocol every per-cycle machine obeys, for both roles.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  PaymentStateMachine                     │
//! │  update(state, height) ──▶ transition table (role, phase)│
//! │          │                                               │
//! │          ▼                                               │
//! │    StepOutcome { Advanced | NoOp | Transient | Fatal }   │
//! └──────────────────────────────────────────────────────────┘
//!          │ MachineContext
//!          ▼
//!   ConfirmationSource  TransportFactory  PuzzleSolver  DestinationWallet
//! ```
//!
//! ## Contract
//!
//! - `update` advances by at most one phase and never moves backwards.
//! - With no precondition met it returns the input state (`NoOp`).
//! - `Success`, `Offline` and `Abandoned` are permanent no-ops.
//! - Only a remote phase mismatch or an unopened promise is transient.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{MachineContext, PaymentStateMachine};
pub use config::MachineConfig;
pub use domain::*;
pub use ports::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
