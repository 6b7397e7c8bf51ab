//! Coffer quota service: wraps the quota engine with env-driven
//! configuration, a SQLite-backed storage implementation, and an HTTP
//! surface for event ingestion and read-only counter queries.

pub mod api;
pub mod config;
pub mod storage;

pub use api::{create_router, ApiState, ErrorResponse};
pub use config::QuotaServiceConfig;
pub use storage::SqliteStorage;
