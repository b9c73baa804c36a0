//! Flat-file persistence for the two record collections.
//!
//! A collection is always read and written whole. There is no locking: two
//! requests that load, mutate and save the same collection concurrently race,
//! and the later save wins.

use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};

mod json_file;
pub mod lenient;
#[cfg(test)]
pub mod memory;
pub mod seed;
pub mod timestamp;

pub use json_file::JsonFileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Students,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Students => "students",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Users => "users.json",
            Collection::Students => "students.json",
        }
    }
}

/// Raw byte access to a collection. Backends only move bytes; the typed
/// `load`/`save` helpers below own the JSON encoding.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// `Ok(None)` when the collection has never been written.
    async fn read(&self, collection: Collection) -> anyhow::Result<Option<Vec<u8>>>;
    async fn write(&self, collection: Collection, bytes: Vec<u8>) -> anyhow::Result<()>;
    async fn exists(&self, collection: Collection) -> bool;
}

/// Every decodable record of a collection plus the number that failed.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    pub rejected: usize,
}

/// Reads a collection record by record. A missing collection is empty; an
/// unreadable file or one that is not a JSON array is an error. Records that
/// do not decode are counted in `rejected` and logged.
pub async fn read_snapshot<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
) -> anyhow::Result<Snapshot<T>> {
    let Some(bytes) = store
        .read(collection)
        .await
        .with_context(|| format!("read {}", collection.name()))?
    else {
        debug!(collection = collection.name(), "collection not found; treating as empty");
        return Ok(Snapshot {
            records: Vec::new(),
            rejected: 0,
        });
    };

    let raw: Vec<serde_json::Value> = serde_json::from_slice(&bytes)
        .with_context(|| format!("decode {}", collection.name()))?;

    let mut records = Vec::with_capacity(raw.len());
    let mut rejected = 0;
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                rejected += 1;
                warn!(collection = collection.name(), index, error = %e, "skipping undecodable record");
            }
        }
    }
    Ok(Snapshot { records, rejected })
}

/// Loads every record that decodes, for read-only use.
///
/// A missing, unreadable or malformed collection is logged and reported as
/// empty.
pub async fn load<T: DeserializeOwned>(store: &dyn RecordStore, collection: Collection) -> Vec<T> {
    match read_snapshot(store, collection).await {
        Ok(snapshot) => snapshot.records,
        Err(e) => {
            error!(collection = collection.name(), error = %e, "failed to load collection");
            Vec::new()
        }
    }
}

/// Loads a collection that is about to be rewritten. Fails unless every
/// stored record decoded, so a save can never drop records it did not read.
pub async fn load_intact<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
) -> anyhow::Result<Vec<T>> {
    let snapshot = read_snapshot(store, collection).await?;
    anyhow::ensure!(
        snapshot.rejected == 0,
        "{} record(s) in {} could not be decoded",
        snapshot.rejected,
        collection.name()
    );
    Ok(snapshot.records)
}

/// Overwrites a collection with `records`. Failures are logged and reported
/// as `false`.
pub async fn save<T: Serialize>(
    store: &dyn RecordStore,
    collection: Collection,
    records: &[T],
) -> bool {
    let bytes = match serde_json::to_vec_pretty(records) {
        Ok(b) => b,
        Err(e) => {
            error!(collection = collection.name(), error = %e, "failed to encode collection");
            return false;
        }
    };
    match store.write(collection, bytes).await {
        Ok(()) => {
            debug!(collection = collection.name(), count = records.len(), "collection saved");
            true
        }
        Err(e) => {
            error!(collection = collection.name(), error = %e, "failed to write collection");
            false
        }
    }
}

/// Sequential id assignment: one past the largest id, or 1 for an empty
/// collection.
pub fn next_id<I: IntoIterator<Item = i64>>(ids: I) -> i64 {
    ids.into_iter().max().map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[test]
    fn next_id_starts_at_one_and_follows_the_max() {
        assert_eq!(next_id(Vec::<i64>::new()), 1);
        assert_eq!(next_id([3, 9, 4]), 10);
    }

    #[tokio::test]
    async fn load_of_missing_collection_is_empty() {
        let store = MemoryStore::default();
        let users: Vec<serde_json::Value> = load(&store, Collection::Users).await;
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn load_of_malformed_collection_is_empty() {
        let store = MemoryStore::default();
        store
            .write(Collection::Students, b"{not json".to_vec())
            .await
            .unwrap();
        let students: Vec<serde_json::Value> = load(&store, Collection::Students).await;
        assert!(students.is_empty());
    }

    #[tokio::test]
    async fn save_overwrites_the_whole_collection() {
        let store = MemoryStore::default();
        assert!(save(&store, Collection::Users, &[1, 2, 3]).await);
        assert!(save(&store, Collection::Users, &[4]).await);
        let back: Vec<i64> = load(&store, Collection::Users).await;
        assert_eq!(back, vec![4]);
    }

    #[tokio::test]
    async fn save_reports_write_failures() {
        let store = MemoryStore::failing_writes();
        assert!(!save(&store, Collection::Users, &[1]).await);
    }

    #[tokio::test]
    async fn undecodable_records_are_skipped_on_read_but_block_rewrites() {
        let store = MemoryStore::default();
        store
            .write(Collection::Users, br#"[1, "two", 3]"#.to_vec())
            .await
            .unwrap();

        let readable: Vec<i64> = load(&store, Collection::Users).await;
        assert_eq!(readable, vec![1, 3]);

        let snapshot = read_snapshot::<i64>(&store, Collection::Users).await.unwrap();
        assert_eq!(snapshot.rejected, 1);

        let err = load_intact::<i64>(&store, Collection::Users).await.unwrap_err();
        assert!(err.to_string().contains("could not be decoded"), "{err}");
    }

    #[tokio::test]
    async fn load_intact_treats_missing_as_empty_and_garbage_as_error() {
        let store = MemoryStore::default();
        let none: Vec<i64> = load_intact(&store, Collection::Students).await.unwrap();
        assert!(none.is_empty());

        store
            .write(Collection::Students, b"{not json".to_vec())
            .await
            .unwrap();
        assert!(load_intact::<i64>(&store, Collection::Students).await.is_err());
    }
}
