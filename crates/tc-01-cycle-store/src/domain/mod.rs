//! # Domain Module
//!
//! Record layout and error types for the cycle state store.

pub mod errors;
pub mod record;

pub use errors::*;
pub use record::*;
