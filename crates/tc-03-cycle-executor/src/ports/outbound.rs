//! # Outbound Ports
//!
//! Block height and block arrival.

use crate::domain::ExecutorError;
use crate::shutdown::ShutdownSignal;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{BlockHash, Height};
use tokio::sync::watch;

/// Block source - outbound port.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Wait until the tip differs from `after`, returning the new tip hash.
    ///
    /// Fails with `ExecutorError::Cancelled` when `shutdown` fires first.
    async fn wait_for_next_block(
        &self,
        after: BlockHash,
        shutdown: &mut ShutdownSignal,
    ) -> Result<BlockHash, ExecutorError>;

    /// Current ledger height.
    async fn current_height(&self) -> Result<Height, ExecutorError>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// Hash the mock chain assigns to `height`.
pub fn mock_block_hash(height: Height) -> BlockHash {
    let mut hash = [0u8; 32];
    hash[..4].copy_from_slice(&height.to_be_bytes());
    hash[31] = 1;
    BlockHash(hash)
}

/// Mock chain whose tip is moved by the test.
pub struct MockBlockSource {
    tip: watch::Sender<(BlockHash, Height)>,
    height_failure: Mutex<Option<String>>,
}

impl MockBlockSource {
    /// Chain with its tip at `height`.
    pub fn new(height: Height) -> Self {
        let (tip, _) = watch::channel((mock_block_hash(height), height));
        Self {
            tip,
            height_failure: Mutex::new(None),
        }
    }

    /// Move the tip to `height`.
    pub fn advance_to(&self, height: Height) {
        self.tip.send_replace((mock_block_hash(height), height));
    }

    /// Make `current_height` fail with `message`, or clear the failure.
    pub fn set_height_failure(&self, message: Option<&str>) {
        *self.height_failure.lock() = message.map(str::to_string);
    }
}

#[async_trait]
impl BlockSource for MockBlockSource {
    async fn wait_for_next_block(
        &self,
        after: BlockHash,
        shutdown: &mut ShutdownSignal,
    ) -> Result<BlockHash, ExecutorError> {
        let mut rx = self.tip.subscribe();
        loop {
            if shutdown.is_shutdown() {
                return Err(ExecutorError::Cancelled);
            }
            let (hash, _) = *rx.borrow_and_update();
            if hash != after {
                return Ok(hash);
            }
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(ExecutorError::BlockSource("chain closed".to_string()));
                    }
                }
                _ = shutdown.cancelled() => return Err(ExecutorError::Cancelled),
            }
        }
    }

    async fn current_height(&self) -> Result<Height, ExecutorError> {
        if let Some(message) = self.height_failure.lock().clone() {
            return Err(ExecutorError::BlockSource(message));
        }
        Ok(self.tip.borrow().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::shutdown_channel;
    use std::time::Duration;

    #[tokio::test]
    async fn test_returns_immediately_when_tip_differs() {
        let source = MockBlockSource::new(100);
        let (_handle, mut signal) = shutdown_channel();
        let hash = source
            .wait_for_next_block(BlockHash::zero(), &mut signal)
            .await
            .unwrap();
        assert_eq!(hash, mock_block_hash(100));
    }

    #[tokio::test]
    async fn test_waits_for_new_block() {
        let source = std::sync::Arc::new(MockBlockSource::new(100));
        let (_handle, mut signal) = shutdown_channel();

        let waiter = {
            let source = source.clone();
            tokio::spawn(async move {
                source
                    .wait_for_next_block(mock_block_hash(100), &mut signal)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        source.advance_to(101);

        let hash = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(hash, mock_block_hash(101));
        assert_eq!(source.current_height().await.unwrap(), 101);
    }

    #[tokio::test]
    async fn test_wait_is_cancellable() {
        let source = MockBlockSource::new(100);
        let (handle, mut signal) = shutdown_channel();
        handle.shutdown();
        let result = source
            .wait_for_next_block(mock_block_hash(100), &mut signal)
            .await;
        assert_eq!(result, Err(ExecutorError::Cancelled));
    }
}
