//! # Client Runtime
//!
//! Bootstraps the client and wires the executor.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Open the repository (memory or RocksDB)
//! 3. Load Tumbler parameters: cached copy if its hash matches the server
//!    URL, otherwise download (3 attempts), confirm, save and verify
//! 4. Build the machine context and executor
//! 5. Start the executor unless running monitor-only

use crate::config::{ClientConfig, StoreBackend};
use crate::errors::RuntimeError;
use crate::interaction::ClientInteraction;
use crate::services::ExternalServices;
use shared_types::{Height, Identity, ParameterHash, TumblerParameters};
use std::sync::Arc;
use tc_01_cycle_store::{
    CycleStateStore, InMemoryKvStore, KeyValueStore, Repository, CONFIGURATION_PARTITION,
};
use tc_02_payment_machine::{MachineContext, PaymentStateMachine, TumblerTransport};
use tc_03_cycle_executor::{ShutdownSignal, StateMachinesExecutor};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Attempts made to download the Tumbler parameters.
pub const PARAMETER_DOWNLOAD_ATTEMPTS: usize = 3;

/// Bootstrapped tumbler client.
pub struct ClientRuntime {
    config: ClientConfig,
    repository: Arc<Repository>,
    services: ExternalServices,
    parameters: Option<TumblerParameters>,
}

impl ClientRuntime {
    /// Bootstrap from configuration, opening the configured store.
    pub async fn from_config(
        config: ClientConfig,
        services: ExternalServices,
        interaction: &dyn ClientInteraction,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let repository = Arc::new(Repository::new(open_store(&config)?));
        Self::bootstrap(config, services, repository, interaction).await
    }

    /// Bootstrap over an already opened repository.
    pub async fn bootstrap(
        config: ClientConfig,
        services: ExternalServices,
        repository: Arc<Repository>,
        interaction: &dyn ClientInteraction,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let mut runtime = Self {
            config,
            repository,
            services,
            parameters: None,
        };
        runtime.parameters = runtime.load_parameters(interaction).await?;
        Ok(runtime)
    }

    /// Runtime configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared repository.
    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Tumbler parameters, if loaded.
    pub fn parameters(&self) -> Option<&TumblerParameters> {
        self.parameters.as_ref()
    }

    /// Per-cycle machine state store.
    pub fn state_store(&self) -> CycleStateStore {
        CycleStateStore::new(self.repository.clone())
    }

    /// Transport for `cycle_start`, under `identity` or a random one.
    pub fn create_tumbler_client(
        &self,
        cycle_start: Height,
        identity: Option<Identity>,
    ) -> Arc<dyn TumblerTransport> {
        let identity = identity.unwrap_or_else(Identity::random);
        self.services.transports.create(cycle_start, Some(identity))
    }

    /// Dependencies of the payment machines.
    pub fn machine_context(&self) -> Result<MachineContext, RuntimeError> {
        let parameters = self.parameters.as_ref().ok_or(RuntimeError::MissingParameters)?;
        Ok(MachineContext {
            config: self.config.machine.clone(),
            cycles: parameters.cycle_generator.clone(),
            explorer: self.services.explorer.clone(),
            transports: self.services.transports.clone(),
            solver: self.services.solver.clone(),
            wallet: self.services.wallet.clone(),
        })
    }

    /// Build the executor without starting it.
    pub fn create_state_machine_job(&self) -> Result<StateMachinesExecutor, RuntimeError> {
        let machine = PaymentStateMachine::new(Arc::new(self.machine_context()?));
        Ok(StateMachinesExecutor::new(
            self.config.executor.clone(),
            self.config.roles.clone(),
            machine,
            self.state_store(),
            self.services.blocks.clone(),
        ))
    }

    /// Start the executor. Returns `None` in monitor-only mode.
    pub fn start(&self, shutdown: ShutdownSignal) -> Result<Option<JoinHandle<()>>, RuntimeError> {
        if self.config.only_monitor {
            info!("[runtime] Monitor-only mode, executor not started");
            return Ok(None);
        }
        Ok(Some(self.create_state_machine_job()?.start(shutdown)))
    }

    async fn load_parameters(
        &self,
        interaction: &dyn ClientInteraction,
    ) -> Result<Option<TumblerParameters>, RuntimeError> {
        let server = self
            .config
            .tumbler_server
            .clone()
            .ok_or_else(|| RuntimeError::Config("tumbler server is not set".to_string()))?;
        let expected = expected_hash(&server)?;

        let cached: Option<TumblerParameters> =
            self.repository.get(CONFIGURATION_PARTITION, &server)?;
        match cached {
            Some(parameters) if parameters.hash() == expected => {
                info!("[runtime] Using cached Tumbler parameters {}", expected);
                return Ok(Some(parameters));
            }
            Some(parameters) => {
                warn!(
                    "[runtime] Discarding cached Tumbler parameters {} (expected {})",
                    parameters.hash(),
                    expected
                );
            }
            None => {}
        }

        if self.config.only_monitor {
            return Ok(None);
        }

        let parameters = self.download_parameters().await?;
        interaction.confirm_parameters(&parameters).await?;
        self.repository.update_or_insert(
            CONFIGURATION_PARTITION,
            &server,
            parameters.clone(),
            |_, new| new,
        )?;

        let actual = parameters.hash();
        if actual != expected {
            return Err(RuntimeError::ParameterHashMismatch { expected, actual });
        }
        parameters.cycle_generator.validate()?;
        info!("[runtime] Tumbler parameters {} verified", actual);
        Ok(Some(parameters))
    }

    async fn download_parameters(&self) -> Result<TumblerParameters, RuntimeError> {
        let transport = self.create_tumbler_client(0, None);
        let mut errors = Vec::with_capacity(PARAMETER_DOWNLOAD_ATTEMPTS);
        for attempt in 1..=PARAMETER_DOWNLOAD_ATTEMPTS {
            match transport.get_parameters().await {
                Ok(parameters) => return Ok(parameters),
                Err(e) => {
                    warn!("[runtime] Parameter download attempt {} failed: {}", attempt, e);
                    errors.push(e);
                }
            }
        }
        Err(RuntimeError::ParameterDownload { errors })
    }
}

fn expected_hash(server: &str) -> Result<ParameterHash, RuntimeError> {
    TumblerParameters::extract_hash_from_url(server).ok_or_else(|| {
        RuntimeError::Config(format!(
            "tumbler server URL {} does not end with a parameter hash",
            server
        ))
    })
}

/// Open the key/value engine selected by the configuration.
pub fn open_store(config: &ClientConfig) -> Result<Arc<dyn KeyValueStore>, RuntimeError> {
    match config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryKvStore::new())),
        #[cfg(feature = "rocksdb")]
        StoreBackend::RocksDb => {
            let store = tc_01_cycle_store::RocksDbStore::open(
                tc_01_cycle_store::RocksDbConfig {
                    path: config.data_dir.join("state"),
                    ..Default::default()
                },
            )?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "rocksdb"))]
        StoreBackend::RocksDb => Err(RuntimeError::Config(
            "built without the rocksdb feature; use the memory store".to_string(),
        )),
    }
}
