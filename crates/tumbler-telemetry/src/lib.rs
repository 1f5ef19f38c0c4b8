//! # Tumbler Telemetry
//!
//! Logging bootstrap for the tumbler client. Every crate logs through
//! `tracing` macros with a bracketed subsystem tag (`[tc-03] ...`); this crate
//! installs the subscriber that formats and filters those events.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tumbler_telemetry::{init_tracing, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_tracing(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TC_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directives |
//! | `TC_JSON_LOGS` | `false` | JSON output |
//! | `TC_SERVICE_NAME` | `tumbler-client` | Service name |

#![warn(missing_docs)]

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// A global subscriber is already installed
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,

    /// The filter directives could not be parsed
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
}
