//! # Cycle State Store
//!
//! Durable storage of machine states, one partition per cycle and one record
//! per machine inside it.

use crate::domain::{
    cycle_partition, parse_cycle_partition, StoreError, CYCLE_PARTITION_PREFIX,
};
use crate::repository::Repository;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::Height;
use std::sync::Arc;
use tracing::debug;

/// Per-cycle machine state storage.
#[derive(Clone)]
pub struct CycleStateStore {
    repository: Arc<Repository>,
}

impl CycleStateStore {
    /// Create a store over a shared repository.
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Create the record for `(cycle_start, key)` unless one already exists.
    ///
    /// Returns `true` if a record was created. An existing record is never
    /// overwritten.
    pub fn create_if_absent<T: Serialize>(
        &self,
        cycle_start: Height,
        key: &str,
        state: &T,
    ) -> Result<bool, StoreError> {
        let partition = cycle_partition(cycle_start);
        let created = self.repository.insert_if_absent(&partition, key, state)?;
        if created {
            debug!("[tc-01] Created {}/{}", partition, key);
        }
        Ok(created)
    }

    /// Persist a state. Last write wins.
    pub fn save<T: Serialize + DeserializeOwned>(
        &self,
        cycle_start: Height,
        key: &str,
        state: T,
    ) -> Result<(), StoreError> {
        let partition = cycle_partition(cycle_start);
        self.repository
            .update_or_insert(&partition, key, state, |_, new| new)?;
        Ok(())
    }

    /// Load one state.
    pub fn load<T: DeserializeOwned>(
        &self,
        cycle_start: Height,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        self.repository.get(&cycle_partition(cycle_start), key)
    }

    /// Every `(record key, state)` pair of a cycle, ascending by record key.
    /// Each state decodes on its own.
    pub fn list_entries<T: DeserializeOwned>(
        &self,
        cycle_start: Height,
    ) -> Result<Vec<(String, Result<T, StoreError>)>, StoreError> {
        self.repository.list_entries(&cycle_partition(cycle_start))
    }

    /// Start of every cycle holding at least one record, ascending.
    pub fn cycle_starts(&self) -> Result<Vec<Height>, StoreError> {
        let mut starts: Vec<Height> = self
            .repository
            .partitions(CYCLE_PARTITION_PREFIX)?
            .iter()
            .filter_map(|p| parse_cycle_partition(p))
            .collect();
        starts.sort_unstable();
        Ok(starts)
    }
}
