use serde::{Deserialize, Serialize};

use coffer_quota_core::{BucketCounters, CollectionCounters};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyEventResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketCountersResponse {
    pub bucket_id: String,
    pub counters: BucketCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionCountersResponse {
    pub bucket_id: String,
    pub collection_id: String,
    pub counters: CollectionCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub details: Option<serde_json::Value>,
}
