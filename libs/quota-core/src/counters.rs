use serde::{Deserialize, Serialize};

/// Aggregate accounting for one bucket: its own representation plus every
/// live collection, group, and record under it.
///
/// Created lazily with zeroed values the first time an event touches the
/// bucket, persisted after every successfully applied event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounters {
    pub collection_count: u64,
    pub record_count: u64,
    pub storage_size: u64,
}

/// Aggregate accounting for one collection, a subset of the parent bucket's
/// totals restricted to that collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionCounters {
    pub record_count: u64,
    pub storage_size: u64,
}
