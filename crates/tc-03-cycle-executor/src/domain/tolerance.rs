//! # Phase Mismatch Tolerance
//!
//! Counts consecutive transient phase mismatches per machine. Counters live
//! in memory only; a restart forgets them.
//!
//! ```text
//! success ─────────────────────────────▶ count = 0
//! transient ──▶ count += 1 ──▶ count > threshold ? Escalated : Tolerated
//! fatal ───────────────────────────────▶ count = 0
//! ```

use shared_types::{Height, Role};
use std::collections::HashMap;

/// Identity of one machine: `(cycle start, role)`.
pub type MachineKey = (Height, Role);

/// Verdict on a transient failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToleranceVerdict {
    /// Within the threshold; stay quiet.
    Tolerated {
        /// Consecutive mismatches so far
        count: u32,
    },
    /// Over the threshold; report it.
    Escalated {
        /// Consecutive mismatches so far
        count: u32,
    },
}

/// Per-machine consecutive mismatch counters.
#[derive(Debug)]
pub struct PhaseTolerance {
    threshold: u32,
    counts: HashMap<MachineKey, u32>,
}

impl PhaseTolerance {
    /// Escalate once a machine has more than `threshold` consecutive
    /// mismatches.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            counts: HashMap::new(),
        }
    }

    /// The machine's step succeeded.
    pub fn record_success(&mut self, key: MachineKey) {
        self.counts.remove(&key);
    }

    /// The machine reported a transient phase mismatch.
    pub fn record_transient(&mut self, key: MachineKey) -> ToleranceVerdict {
        let count = self.counts.entry(key).or_insert(0);
        *count = count.saturating_add(1);
        if *count > self.threshold {
            ToleranceVerdict::Escalated { count: *count }
        } else {
            ToleranceVerdict::Tolerated { count: *count }
        }
    }

    /// The machine failed for another reason; the streak is broken.
    pub fn record_fatal(&mut self, key: MachineKey) {
        self.counts.remove(&key);
    }

    /// Current consecutive mismatch count.
    pub fn count(&self, key: &MachineKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Drop counters of cycles that are no longer active.
    pub fn retain_cycles(&mut self, active: impl Fn(Height) -> bool) {
        self.counts.retain(|(cycle, _), _| active(*cycle));
    }
}
