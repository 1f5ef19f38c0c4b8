//! # Domain Layer
//!
//! Phases, machine state, the `(role, phase)` transition table and step
//! outcomes. Pure; no I/O.

pub mod errors;
pub mod outcome;
pub mod phase;
pub mod state;
pub mod transitions;

pub use errors::*;
pub use outcome::*;
pub use phase::*;
pub use state::*;
pub use transitions::*;
