//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,

    /// Filter directives (trace, debug, info, warn, error, or
    /// `target=level` lists)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to include the event target
    pub with_target: bool,

    /// Whether to include thread ids
    pub with_thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "tumbler-client".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            with_target: true,
            with_thread_ids: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TC_SERVICE_NAME`: Service name (default: tumbler-client)
    /// - `TC_LOG_LEVEL` or `RUST_LOG`: Filter directives (default: info)
    /// - `TC_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("TC_SERVICE_NAME")
                .unwrap_or_else(|_| "tumbler-client".to_string()),

            log_level: env::var("TC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("TC_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            with_thread_ids: is_container,
            ..Self::default()
        }
    }

    /// Configuration for tests: debug level, human format.
    pub fn for_testing() -> Self {
        Self {
            service_name: "tumbler-client-test".to_string(),
            log_level: "debug".to_string(),
            ..Self::default()
        }
    }
}
