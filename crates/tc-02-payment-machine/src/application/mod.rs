//! # Application Layer
//!
//! The machine context and the update step.

pub mod context;
pub mod machine;

pub use context::MachineContext;
pub use machine::PaymentStateMachine;
