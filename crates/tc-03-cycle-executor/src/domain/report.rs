//! # Tick Report

use serde::Serialize;
use shared_types::Height;

/// Summary of one executor tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Ledger height the tick ran at.
    pub height: Height,
    /// Cycles whose machines were created by this tick.
    pub cycles_created: Vec<Height>,
    /// Machines updated.
    pub machines_updated: usize,
    /// Machines that moved to a later phase.
    pub advanced: usize,
    /// Machines whose preconditions were not met.
    pub no_op: usize,
    /// Tolerated phase mismatches.
    pub transient: usize,
    /// Phase mismatches over the tolerance threshold.
    pub escalated: usize,
    /// Other machine failures.
    pub fatal: usize,
    /// Records skipped because they did not decode.
    pub corrupt: usize,
}
