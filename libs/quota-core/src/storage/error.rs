use thiserror::Error;

/// Failures surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object {object_id:?} under {parent_id:?} not found")]
    NotFound {
        parent_id: String,
        object_id: String,
    },
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    pub fn not_found(parent_id: &str, object_id: &str) -> Self {
        StorageError::NotFound {
            parent_id: parent_id.to_string(),
            object_id: object_id.to_string(),
        }
    }

    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StorageError::Backend(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
