pub mod error;
pub mod memory;

pub use error::StorageError;
pub use memory::MemoryStorage;

use serde_json::Value;

/// Namespace under which counter records are kept.
pub const QUOTA_NAMESPACE: &str = "quota";
/// Namespace the host store keeps record representations in.
pub const RECORD_NAMESPACE: &str = "record";

/// Key/value persistence with existence semantics, keyed by
/// `(namespace, parent URI, object id)`.
///
/// Backends only need plain single-key get/set/delete plus two bulk
/// operations scoped to a parent URI; no cross-key transaction is assumed.
/// Pattern operations accept a parent URI glob with a single trailing `*`.
pub trait Storage: Send + Sync {
    /// Fetches one object. [`StorageError::NotFound`] when absent.
    fn get(&self, namespace: &str, parent_id: &str, object_id: &str)
        -> Result<Value, StorageError>;

    /// Creates or replaces one object.
    fn set(
        &self,
        namespace: &str,
        parent_id: &str,
        object_id: &str,
        value: &Value,
    ) -> Result<(), StorageError>;

    /// Removes one object. [`StorageError::NotFound`] when absent.
    fn delete(&self, namespace: &str, parent_id: &str, object_id: &str)
        -> Result<(), StorageError>;

    /// Removes every object whose parent URI matches the glob and returns
    /// how many were removed. Matching nothing is not an error.
    fn delete_matching(&self, namespace: &str, parent_pattern: &str)
        -> Result<usize, StorageError>;

    /// Lists every object stored under one parent URI.
    fn list(&self, namespace: &str, parent_id: &str) -> Result<Vec<Value>, StorageError>;
}
