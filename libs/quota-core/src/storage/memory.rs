use dashmap::DashMap;
use serde_json::Value;

use super::{Storage, StorageError};

type ObjectKey = (String, String, String);

/// DashMap-backed storage, suitable for tests and in-process embedding.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: DashMap<ObjectKey, Value>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all namespaces.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn key(namespace: &str, parent_id: &str, object_id: &str) -> ObjectKey {
    (
        namespace.to_string(),
        parent_id.to_string(),
        object_id.to_string(),
    )
}

fn parent_matches(parent_id: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => parent_id.starts_with(prefix),
        None => parent_id == pattern,
    }
}

impl Storage for MemoryStorage {
    fn get(
        &self,
        namespace: &str,
        parent_id: &str,
        object_id: &str,
    ) -> Result<Value, StorageError> {
        self.objects
            .get(&key(namespace, parent_id, object_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found(parent_id, object_id))
    }

    fn set(
        &self,
        namespace: &str,
        parent_id: &str,
        object_id: &str,
        value: &Value,
    ) -> Result<(), StorageError> {
        self.objects
            .insert(key(namespace, parent_id, object_id), value.clone());
        Ok(())
    }

    fn delete(
        &self,
        namespace: &str,
        parent_id: &str,
        object_id: &str,
    ) -> Result<(), StorageError> {
        self.objects
            .remove(&key(namespace, parent_id, object_id))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(parent_id, object_id))
    }

    fn delete_matching(
        &self,
        namespace: &str,
        parent_pattern: &str,
    ) -> Result<usize, StorageError> {
        let matching: Vec<ObjectKey> = self
            .objects
            .iter()
            .filter(|entry| {
                entry.key().0 == namespace && parent_matches(&entry.key().1, parent_pattern)
            })
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in matching {
            if self.objects.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn list(&self, namespace: &str, parent_id: &str) -> Result<Vec<Value>, StorageError> {
        let mut entries: Vec<(String, Value)> = self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == namespace && entry.key().1 == parent_id)
            .map(|entry| (entry.key().2.clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries.into_iter().map(|(_, value)| value).collect())
    }
}
