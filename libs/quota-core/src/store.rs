use std::sync::Arc;

use serde_json::Value;

use crate::counters::{BucketCounters, CollectionCounters};
use crate::storage::{Storage, StorageError, QUOTA_NAMESPACE, RECORD_NAMESPACE};

/// Object id of the per-bucket counters record.
pub const BUCKET_INFO: &str = "bucket_info";
/// Object id of the per-collection counters record.
pub const COLLECTION_INFO: &str = "collection_info";

/// Typed accessor over the storage backend for counter records.
///
/// Counter records live in the `quota` namespace keyed by the URI of the
/// bucket or collection they describe. Deletes are tolerant: removing a
/// record that does not exist is not an error.
pub struct CounterStore<S> {
    storage: Arc<S>,
}

impl<S> Clone for CounterStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> CounterStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn get_bucket_counters(
        &self,
        bucket_uri: &str,
    ) -> Result<Option<BucketCounters>, StorageError> {
        match self.storage.get(QUOTA_NAMESPACE, bucket_uri, BUCKET_INFO) {
            Ok(value) => Ok(Some(decode(value)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn put_bucket_counters(
        &self,
        bucket_uri: &str,
        counters: &BucketCounters,
    ) -> Result<(), StorageError> {
        let value = encode(counters)?;
        self.storage
            .set(QUOTA_NAMESPACE, bucket_uri, BUCKET_INFO, &value)
    }

    pub fn delete_bucket_counters(&self, bucket_uri: &str) -> Result<(), StorageError> {
        tolerate_missing(
            self.storage
                .delete(QUOTA_NAMESPACE, bucket_uri, BUCKET_INFO),
        )
    }

    pub fn get_collection_counters(
        &self,
        collection_uri: &str,
    ) -> Result<Option<CollectionCounters>, StorageError> {
        match self
            .storage
            .get(QUOTA_NAMESPACE, collection_uri, COLLECTION_INFO)
        {
            Ok(value) => Ok(Some(decode(value)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn put_collection_counters(
        &self,
        collection_uri: &str,
        counters: &CollectionCounters,
    ) -> Result<(), StorageError> {
        let value = encode(counters)?;
        self.storage
            .set(QUOTA_NAMESPACE, collection_uri, COLLECTION_INFO, &value)
    }

    pub fn delete_collection_counters(&self, collection_uri: &str) -> Result<(), StorageError> {
        tolerate_missing(
            self.storage
                .delete(QUOTA_NAMESPACE, collection_uri, COLLECTION_INFO),
        )
    }

    /// Bulk removal of every collection counters record whose collection URI
    /// matches the glob; used when a whole bucket disappears.
    pub fn delete_collection_counters_matching(
        &self,
        pattern: &str,
    ) -> Result<usize, StorageError> {
        self.storage.delete_matching(QUOTA_NAMESPACE, pattern)
    }

    /// Record representations currently stored under a collection. Only used
    /// for cascading collection deletion, where the removed records never
    /// produce their own notifications.
    pub fn list_records_under_collection(
        &self,
        collection_uri: &str,
    ) -> Result<Vec<Value>, StorageError> {
        self.storage.list(RECORD_NAMESPACE, collection_uri)
    }
}

fn tolerate_missing(result: Result<(), StorageError>) -> Result<(), StorageError> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, StorageError> {
    serde_json::from_value(value).map_err(StorageError::backend)
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(StorageError::backend)
}

#[cfg(test)]
mod tests {
    use crate::storage::MemoryStorage;

    use super::*;

    fn store() -> CounterStore<MemoryStorage> {
        CounterStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_missing_counters_read_as_none() {
        let store = store();
        assert!(store.get_bucket_counters("/buckets/b").unwrap().is_none());
        assert!(store
            .get_collection_counters("/buckets/b/collections/c")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_bucket_counters_roundtrip() {
        let store = store();
        let counters = BucketCounters {
            collection_count: 1,
            record_count: 4,
            storage_size: 512,
        };
        store.put_bucket_counters("/buckets/b", &counters).unwrap();
        assert_eq!(
            store.get_bucket_counters("/buckets/b").unwrap(),
            Some(counters)
        );
    }

    #[test]
    fn test_deleting_absent_counters_is_fine() {
        let store = store();
        store.delete_bucket_counters("/buckets/b").unwrap();
        store
            .delete_collection_counters("/buckets/b/collections/c")
            .unwrap();
    }
}
