//! # Client Runtime
//!
//! Bootstrap and wiring of the tumbler client: configuration, Tumbler
//! parameter download and caching, and the state machines executor.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env();
//! tumbler_telemetry::init_tracing(&config.telemetry)?;
//!
//! let runtime = ClientRuntime::from_config(config, services, &AcceptAllInteraction).await?;
//! let (handle, signal) = shutdown_channel();
//! let job = runtime.start(signal)?;
//! // ...
//! handle.shutdown();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod errors;
pub mod interaction;
pub mod runtime;
pub mod services;

pub use config::{parse_roles, ClientConfig, StoreBackend};
pub use errors::RuntimeError;
pub use interaction::{AcceptAllInteraction, ClientInteraction};
pub use runtime::{open_store, ClientRuntime, PARAMETER_DOWNLOAD_ATTEMPTS};
pub use services::ExternalServices;
pub use tc_03_cycle_executor::{shutdown_channel, ShutdownHandle, ShutdownSignal};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
