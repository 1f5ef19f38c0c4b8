//! # Client Configuration
//!
//! Runtime parameters with sane defaults and environment overrides.

use crate::errors::RuntimeError;
use serde::{Deserialize, Serialize};
use shared_types::{Role, TumblerParameters};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tc_02_payment_machine::MachineConfig;
use tc_03_cycle_executor::ExecutorConfig;
use tracing::warn;
use tumbler_telemetry::TelemetryConfig;

/// Storage engine for the repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    /// Volatile in-memory store.
    Memory,
    /// RocksDB under the data directory.
    RocksDb,
}

impl FromStr for StoreBackend {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "rocksdb" | "rocks" => Ok(StoreBackend::RocksDb),
            other => Err(RuntimeError::Config(format!("unknown store backend: {}", other))),
        }
    }
}

/// Complete client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Tumbler URL; its last path segment is the expected parameter hash.
    pub tumbler_server: Option<String>,
    /// Directory holding the durable store.
    pub data_dir: PathBuf,
    /// Observe only: never download parameters or start the executor.
    pub only_monitor: bool,
    /// Roles run in every cycle.
    pub roles: Vec<Role>,
    /// Storage engine.
    pub store_backend: StoreBackend,
    /// Executor configuration.
    pub executor: ExecutorConfig,
    /// Payment machine configuration.
    pub machine: MachineConfig,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tumbler_server: None,
            data_dir: PathBuf::from("./data"),
            only_monitor: false,
            roles: Role::ALL.to_vec(),
            store_backend: StoreBackend::RocksDb,
            executor: ExecutorConfig::default(),
            machine: MachineConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `TC_TUMBLER_SERVER`: Tumbler URL
    /// - `TC_DATA_DIR`: Data directory (default: ./data)
    /// - `TC_ONLY_MONITOR`: Observe only (default: false)
    /// - `TC_COOPERATIVE`: Cooperative payee cash-out (default: true)
    /// - `TC_ROLES`: Comma separated roles (default: payer,payee)
    /// - `TC_STORE`: `memory` or `rocksdb` (default: rocksdb)
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self {
            telemetry: TelemetryConfig::from_env(),
            ..Self::default()
        };

        if let Ok(server) = env::var("TC_TUMBLER_SERVER") {
            config.tumbler_server = Some(server);
        }
        if let Ok(dir) = env::var("TC_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(value) = env::var("TC_ONLY_MONITOR") {
            config.only_monitor = parse_flag(&value);
        }
        if let Ok(value) = env::var("TC_COOPERATIVE") {
            config.machine.cooperative = parse_flag(&value);
        }
        if let Ok(value) = env::var("TC_ROLES") {
            match parse_roles(&value) {
                Ok(roles) => config.roles = roles,
                Err(e) => warn!("[runtime] Ignoring TC_ROLES: {}", e),
            }
        }
        if let Ok(value) = env::var("TC_STORE") {
            match value.parse() {
                Ok(backend) => config.store_backend = backend,
                Err(e) => warn!("[runtime] Ignoring TC_STORE: {}", e),
            }
        }

        config
    }

    /// Configuration for tests: in-memory store, short backoff.
    pub fn for_testing(tumbler_server: impl Into<String>) -> Self {
        Self {
            tumbler_server: Some(tumbler_server.into()),
            store_backend: StoreBackend::Memory,
            executor: ExecutorConfig::for_testing(),
            machine: MachineConfig::for_testing(),
            telemetry: TelemetryConfig::for_testing(),
            ..Self::default()
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        let server = self
            .tumbler_server
            .as_deref()
            .ok_or_else(|| RuntimeError::Config("tumbler server is not set".to_string()))?;
        if TumblerParameters::extract_hash_from_url(server).is_none() {
            return Err(RuntimeError::Config(format!(
                "tumbler server URL {} does not end with a parameter hash",
                server
            )));
        }
        if self.roles.is_empty() && !self.only_monitor {
            return Err(RuntimeError::Config("no roles configured".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Parse a comma separated role list.
pub fn parse_roles(value: &str) -> Result<Vec<Role>, RuntimeError> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Role>().map_err(RuntimeError::Config))
        .collect()
}
