use thiserror::Error;

use crate::settings::QuotaLimitName;
use crate::storage::StorageError;

/// Which scope's ceiling was breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Bucket,
    Collection,
}

impl LimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitScope::Bucket => "bucket",
            LimitScope::Collection => "collection",
        }
    }
}

/// Diagnostic detail for a rejected mutation. Surfaced through logs and the
/// service's error envelope details; callers only see the fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaBreach {
    pub scope: LimitScope,
    pub limit: QuotaLimitName,
    pub maximum: u64,
    pub actual: u64,
}

/// Errors produced by the quota engine.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// A per-item or aggregate ceiling would be breached. The triggering
    /// mutation is rejected and no counters were written.
    #[error("There was not enough space to save the resource")]
    Exceeded(QuotaBreach),

    /// The storage backend failed for a reason other than a missing record.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
