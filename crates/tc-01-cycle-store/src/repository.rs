//! # Record Repository
//!
//! Typed, partitioned records over a [`KeyValueStore`]. Values are stored as
//! JSON so other tooling can inspect them.

use crate::domain::{
    is_valid_partition, partition_prefix, record_key, StoreError, PARTITION_SEPARATOR,
};
use crate::ports::KeyValueStore;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Partitioned record repository.
///
/// Read-modify-write operations are serialized by a repository-wide write
/// lock, so `update_or_insert` and `insert_if_absent` are atomic with respect
/// to each other.
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl Repository {
    /// Create a repository over a key/value engine.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Read one record.
    pub fn get<T: DeserializeOwned>(&self, partition: &str, key: &str) -> Result<Option<T>, StoreError> {
        let engine_key = Self::engine_key(partition, key)?;
        match self.store.get(&engine_key)? {
            Some(bytes) => Ok(Some(decode(partition, key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Every `(key, record)` pair of a partition, ascending by key.
    ///
    /// Records are decoded one by one, so a corrupt record only fails its own
    /// entry.
    pub fn list_entries<T: DeserializeOwned>(
        &self,
        partition: &str,
    ) -> Result<Vec<(String, Result<T, StoreError>)>, StoreError> {
        if !is_valid_partition(partition) {
            return Err(StoreError::InvalidPartition(partition.to_string()));
        }
        let prefix = partition_prefix(partition);
        Ok(self
            .store
            .prefix_scan(&prefix)?
            .into_iter()
            .map(|(engine_key, bytes)| {
                let key = String::from_utf8_lossy(&engine_key[prefix.len()..]).into_owned();
                let value = decode(partition, &key, &bytes);
                (key, value)
            })
            .collect())
    }

    /// Names of the partitions starting with `prefix` that hold at least one
    /// record, ascending.
    pub fn partitions(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = Vec::new();
        for (engine_key, _) in self.store.prefix_scan(prefix.as_bytes())? {
            let Some(end) = engine_key.iter().position(|b| *b == PARTITION_SEPARATOR) else {
                continue;
            };
            let name = String::from_utf8_lossy(&engine_key[..end]);
            if names.last().map(String::as_str) != Some(name.as_ref()) {
                names.push(name.into_owned());
            }
        }
        Ok(names)
    }

    /// Insert `value`, or replace the existing record with `merge(existing, value)`.
    ///
    /// Returns the record as stored.
    pub fn update_or_insert<T, F>(
        &self,
        partition: &str,
        key: &str,
        value: T,
        merge: F,
    ) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T, T) -> T,
    {
        let engine_key = Self::engine_key(partition, key)?;
        let _guard = self.write_lock.lock();

        let stored = match self.store.get(&engine_key)? {
            Some(bytes) => merge(decode(partition, key, &bytes)?, value),
            None => value,
        };
        self.store
            .put(&engine_key, &encode(partition, key, &stored)?)?;
        Ok(stored)
    }

    /// Insert `value` only if no record exists under the key.
    ///
    /// Returns `true` if the record was written.
    pub fn insert_if_absent<T: Serialize>(
        &self,
        partition: &str,
        key: &str,
        value: &T,
    ) -> Result<bool, StoreError> {
        let engine_key = Self::engine_key(partition, key)?;
        let _guard = self.write_lock.lock();

        if self.store.exists(&engine_key)? {
            return Ok(false);
        }
        self.store.put(&engine_key, &encode(partition, key, value)?)?;
        Ok(true)
    }

    fn engine_key(partition: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        if !is_valid_partition(partition) {
            return Err(StoreError::InvalidPartition(partition.to_string()));
        }
        Ok(record_key(partition, key))
    }
}

fn encode<T: Serialize>(partition: &str, key: &str, value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Encoding {
        partition: partition.to_string(),
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(partition: &str, key: &str, bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corruption {
        partition: partition.to_string(),
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryKvStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        value: u32,
    }

    fn repository() -> (Arc<InMemoryKvStore>, Repository) {
        let store = Arc::new(InMemoryKvStore::new());
        (store.clone(), Repository::new(store))
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_, repo) = repository();
        assert_eq!(repo.get::<Record>("P", "k").unwrap(), None);
    }

    #[test]
    fn test_update_or_insert_merges_existing() {
        let (_, repo) = repository();
        repo.update_or_insert("P", "k", Record { value: 1 }, |_, n| n)
            .unwrap();
        let stored = repo
            .update_or_insert("P", "k", Record { value: 5 }, |o, n| Record {
                value: o.value + n.value,
            })
            .unwrap();
        assert_eq!(stored, Record { value: 6 });
        assert_eq!(repo.get::<Record>("P", "k").unwrap(), Some(stored));
    }

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let (_, repo) = repository();
        assert!(repo.insert_if_absent("P", "k", &Record { value: 1 }).unwrap());
        assert!(!repo.insert_if_absent("P", "k", &Record { value: 2 }).unwrap());
        assert_eq!(repo.get::<Record>("P", "k").unwrap(), Some(Record { value: 1 }));
    }

    #[test]
    fn test_list_is_scoped_to_partition() {
        let (_, repo) = repository();
        repo.insert_if_absent("Cycle_1", "b", &Record { value: 2 }).unwrap();
        repo.insert_if_absent("Cycle_1", "a", &Record { value: 1 }).unwrap();
        repo.insert_if_absent("Cycle_10", "a", &Record { value: 10 }).unwrap();

        let entries = repo.list_entries::<Record>("Cycle_1").unwrap();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), Ok(Record { value: 1 })),
                ("b".to_string(), Ok(Record { value: 2 })),
            ]
        );
    }

    #[test]
    fn test_corrupt_entry_does_not_hide_its_neighbours() {
        let (store, repo) = repository();
        repo.insert_if_absent("Cycle_1", "a", &Record { value: 1 }).unwrap();
        store.put(b"Cycle_1/b", b"garbage").unwrap();
        repo.insert_if_absent("Cycle_1", "c", &Record { value: 3 }).unwrap();

        let entries = repo.list_entries::<Record>("Cycle_1").unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].1, Ok(Record { value: 1 }));
        assert!(matches!(
            &entries[1].1,
            Err(StoreError::Corruption { key, .. }) if key == "b"
        ));
        assert_eq!(entries[2].1, Ok(Record { value: 3 }));
    }

    #[test]
    fn test_partitions_by_prefix() {
        let (_, repo) = repository();
        repo.insert_if_absent("Cycle_1", "a", &Record { value: 1 }).unwrap();
        repo.insert_if_absent("Cycle_1", "b", &Record { value: 2 }).unwrap();
        repo.insert_if_absent("Cycle_10", "a", &Record { value: 3 }).unwrap();
        repo.insert_if_absent("Configuration", "x", &Record { value: 4 }).unwrap();

        assert_eq!(
            repo.partitions("Cycle_").unwrap(),
            vec!["Cycle_1".to_string(), "Cycle_10".to_string()]
        );
    }

    #[test]
    fn test_invalid_partition_rejected() {
        let (_, repo) = repository();
        assert!(matches!(
            repo.insert_if_absent("a/b", "k", &Record { value: 1 }),
            Err(StoreError::InvalidPartition(_))
        ));
        assert!(matches!(
            repo.list_entries::<Record>(""),
            Err(StoreError::InvalidPartition(_))
        ));
    }

    #[test]
    fn test_corrupt_record_reported() {
        let (store, repo) = repository();
        store.put(b"P/k", b"not json").unwrap();
        assert!(matches!(
            repo.get::<Record>("P", "k"),
            Err(StoreError::Corruption { .. })
        ));
    }
}
