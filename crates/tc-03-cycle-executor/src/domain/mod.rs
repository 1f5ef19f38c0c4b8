//! # Domain Module
//!
//! Errors, the phase-mismatch tolerance policy and tick reports.

pub mod errors;
pub mod report;
pub mod tolerance;

pub use errors::*;
pub use report::*;
pub use tolerance::*;
