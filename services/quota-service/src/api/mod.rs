use std::sync::Mutex;

pub mod handlers;
pub mod router;
pub mod types;

pub use router::create_router;
pub use types::*;

use coffer_quota_core::QuotaEngine;

use crate::storage::SqliteStorage;

/// Shared service state.
///
/// `apply_lock` serializes the engine's read-modify-write pass so two
/// concurrent notifications for the same bucket cannot clobber each other's
/// counter writes.
pub struct ApiState {
    pub engine: QuotaEngine<SqliteStorage>,
    pub apply_lock: Mutex<()>,
}

impl ApiState {
    pub fn new(engine: QuotaEngine<SqliteStorage>) -> Self {
        Self {
            engine,
            apply_lock: Mutex::new(()),
        }
    }
}
