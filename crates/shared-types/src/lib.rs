//! # Shared Types Crate
//!
//! Ledger primitives and protocol value objects shared by every crate of the
//! tumbler client.
//!
//! ## Contents
//!
//! - **Entities**: `Height`, `BlockHash`, `TxId`, `Role`, `Identity`
//! - **Cycles**: `CycleParameters`, `CyclePeriods`, `CycleGenerator`
//! - **Parameters**: `TumblerParameters` and its content hash
//!
//! Cycles are pure functions of the Tumbler's published parameters. Nothing in
//! this crate performs I/O.

pub mod cycle;
pub mod entities;
pub mod errors;
pub mod parameters;

pub use cycle::{CycleGenerator, CycleParameters, CyclePeriods, CyclePhase, Period};
pub use entities::*;
pub use errors::*;
pub use parameters::{ParameterHash, TumblerParameters};
