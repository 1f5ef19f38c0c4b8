//! # External Services
//!
//! Adapters the embedder supplies: ledger, explorer, Tumbler transport,
//! puzzle sub-protocol and wallet.

use std::sync::Arc;
use tc_02_payment_machine::{ConfirmationSource, DestinationWallet, PuzzleSolver, TransportFactory};
use tc_03_cycle_executor::BlockSource;

/// Handles to every external collaborator.
#[derive(Clone)]
pub struct ExternalServices {
    /// Block arrival and height.
    pub blocks: Arc<dyn BlockSource>,
    /// Confirmation depths.
    pub explorer: Arc<dyn ConfirmationSource>,
    /// Identity-scoped Tumbler transports.
    pub transports: Arc<dyn TransportFactory>,
    /// Puzzle sub-protocol.
    pub solver: Arc<dyn PuzzleSolver>,
    /// Cash-out destinations.
    pub wallet: Arc<dyn DestinationWallet>,
}
