//! # Executor Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay before retrying a failed tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackoffPolicy {
    /// Same delay after every failure.
    Fixed(Duration),
    /// `base * 2^(n-1)` after the n-th consecutive failure, capped at `max`.
    Exponential {
        /// Delay after the first failure
        base: Duration,
        /// Upper bound
        max: Duration,
    },
}

impl BackoffPolicy {
    /// Delay after `consecutive_failures` failed ticks (1-based).
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        match self {
            BackoffPolicy::Fixed(delay) => *delay,
            BackoffPolicy::Exponential { base, max } => {
                let shift = consecutive_failures.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift).min(*max)
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed(Duration::from_secs(5))
    }
}

/// Executor configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Consecutive phase mismatches tolerated before they are logged as
    /// errors.
    pub invalid_phase_threshold: u32,

    /// Delay before retrying a failed tick.
    pub backoff: BackoffPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            invalid_phase_threshold: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ExecutorConfig {
    /// Create a config for testing (short backoff).
    pub fn for_testing() -> Self {
        Self {
            backoff: BackoffPolicy::Fixed(Duration::from_millis(10)),
            ..Self::default()
        }
    }
}
