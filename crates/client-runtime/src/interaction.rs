//! # Client Interaction
//!
//! Confirmation of freshly downloaded Tumbler parameters.

use crate::errors::RuntimeError;
use async_trait::async_trait;
use shared_types::TumblerParameters;
use tracing::info;

/// User confirmation port.
#[async_trait]
pub trait ClientInteraction: Send + Sync {
    /// Accept or refuse parameters downloaded from the Tumbler.
    ///
    /// Refusal aborts bootstrap.
    async fn confirm_parameters(&self, parameters: &TumblerParameters) -> Result<(), RuntimeError>;
}

/// Accepts any parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllInteraction;

#[async_trait]
impl ClientInteraction for AcceptAllInteraction {
    async fn confirm_parameters(&self, parameters: &TumblerParameters) -> Result<(), RuntimeError> {
        info!(
            network = %parameters.network,
            denomination = parameters.denomination,
            fee = parameters.fee,
            "[runtime] Accepting Tumbler parameters"
        );
        Ok(())
    }
}
