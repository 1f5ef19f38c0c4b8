//! # Machine Context
//!
//! Handles to every external collaborator, built once by the embedder and
//! shared by all machines.

use crate::config::MachineConfig;
use crate::ports::{ConfirmationSource, DestinationWallet, PuzzleSolver, TransportFactory};
use shared_types::CycleGenerator;
use std::sync::Arc;

/// Immutable dependencies of the update step.
#[derive(Clone)]
pub struct MachineContext {
    /// Machine configuration.
    pub config: MachineConfig,
    /// Cycle schedule derived from the Tumbler parameters.
    pub cycles: CycleGenerator,
    /// Block explorer.
    pub explorer: Arc<dyn ConfirmationSource>,
    /// Tumbler transports.
    pub transports: Arc<dyn TransportFactory>,
    /// Puzzle sub-protocol.
    pub solver: Arc<dyn PuzzleSolver>,
    /// Cash-out wallet.
    pub wallet: Arc<dyn DestinationWallet>,
}
