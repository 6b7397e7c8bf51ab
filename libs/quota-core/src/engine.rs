use std::sync::Arc;

use tracing::{debug, warn};

use crate::counters::{BucketCounters, CollectionCounters};
use crate::error::{LimitScope, QuotaBreach, QuotaError};
use crate::event::{self, ChangeAction, ChangeNotification, ResourceKind};
use crate::settings::{QuotaLimitName, QuotaSettings};
use crate::size;
use crate::storage::Storage;
use crate::store::CounterStore;

/// Limits applicable to one notification, resolved once up front.
#[derive(Debug, Clone, Copy)]
struct EffectiveLimits {
    bucket_max_bytes: Option<u64>,
    bucket_max_items: Option<u64>,
    collection_max_bytes: Option<u64>,
    collection_max_items: Option<u64>,
    max_bytes_per_item: Option<u64>,
    per_item_scope: LimitScope,
}

/// Accounting engine for the bucket hierarchy.
///
/// Consumes one [`ChangeNotification`] at a time, updates the in-memory
/// bucket and collection counters for every impacted item, validates the
/// result against the effective limits, and only then persists. A rejected
/// notification leaves every persisted counter untouched.
pub struct QuotaEngine<S> {
    store: CounterStore<S>,
    settings: QuotaSettings,
}

impl<S: Storage> QuotaEngine<S> {
    pub fn new(storage: Arc<S>, settings: QuotaSettings) -> Self {
        Self {
            store: CounterStore::new(storage),
            settings,
        }
    }

    /// Current counters for a bucket; zeroed when nothing has been tracked
    /// for it yet.
    pub fn bucket_counters(&self, bucket_id: &str) -> Result<BucketCounters, QuotaError> {
        let uri = event::bucket_uri(bucket_id);
        Ok(self.store.get_bucket_counters(&uri)?.unwrap_or_default())
    }

    /// Current counters for a collection; zeroed when nothing has been
    /// tracked for it yet.
    pub fn collection_counters(
        &self,
        bucket_id: &str,
        collection_id: &str,
    ) -> Result<CollectionCounters, QuotaError> {
        let uri = event::collection_uri(bucket_id, collection_id);
        Ok(self.store.get_collection_counters(&uri)?.unwrap_or_default())
    }

    /// Validates one change notification against the effective limits and,
    /// on success, persists the updated counters.
    pub fn apply(&self, notification: &ChangeNotification) -> Result<(), QuotaError> {
        let bucket_uri = notification.bucket_uri();
        let collection_uri = notification.collection_uri();

        if notification.action == ChangeAction::Delete
            && notification.resource == ResourceKind::Bucket
        {
            return self.remove_bucket(notification, &bucket_uri);
        }

        let limits = self.resolve_limits(notification);

        let mut bucket = self.store.get_bucket_counters(&bucket_uri)?.unwrap_or_default();
        let mut collection = CollectionCounters::default();
        if let Some(uri) = collection_uri.as_deref() {
            if let Some(existing) = self.store.get_collection_counters(uri)? {
                collection = existing;
            }
        }

        for item in notification.normalized_items() {
            let old_size = size::optional_size(item.old.as_ref());
            let new_size = size::optional_size(item.new.as_ref());

            if notification.action != ChangeAction::Delete {
                if let Some(maximum) = limits.max_bytes_per_item {
                    if new_size > maximum {
                        return Err(self.reject(
                            notification,
                            &item.uri,
                            QuotaBreach {
                                scope: limits.per_item_scope,
                                limit: QuotaLimitName::MaxBytesPerItem,
                                maximum,
                                actual: new_size,
                            },
                        ));
                    }
                }
            }

            match notification.action {
                ChangeAction::Create => {
                    bucket.storage_size = bucket.storage_size.saturating_add(new_size);
                    match notification.resource {
                        ResourceKind::Collection => {
                            bucket.collection_count = bucket.collection_count.saturating_add(1);
                            collection.storage_size =
                                collection.storage_size.saturating_add(new_size);
                        }
                        ResourceKind::Record => {
                            bucket.record_count = bucket.record_count.saturating_add(1);
                            collection.record_count = collection.record_count.saturating_add(1);
                            collection.storage_size =
                                collection.storage_size.saturating_add(new_size);
                        }
                        ResourceKind::Bucket | ResourceKind::Group => {}
                    }
                }
                ChangeAction::Update => {
                    bucket.storage_size = bucket
                        .storage_size
                        .saturating_sub(old_size)
                        .saturating_add(new_size);
                    if matches!(
                        notification.resource,
                        ResourceKind::Collection | ResourceKind::Record
                    ) {
                        collection.storage_size = collection
                            .storage_size
                            .saturating_sub(old_size)
                            .saturating_add(new_size);
                    }
                }
                ChangeAction::Delete => {
                    bucket.storage_size = bucket.storage_size.saturating_sub(old_size);
                    match notification.resource {
                        ResourceKind::Collection => {
                            bucket.collection_count = bucket.collection_count.saturating_sub(1);
                            // Records under the collection disappear with it
                            // and never produce their own notifications.
                            if let Some(uri) = collection_uri.as_deref() {
                                for record in self.store.list_records_under_collection(uri)? {
                                    let record_size = size::object_size(&record);
                                    bucket.record_count = bucket.record_count.saturating_sub(1);
                                    bucket.storage_size =
                                        bucket.storage_size.saturating_sub(record_size);
                                    collection.record_count =
                                        collection.record_count.saturating_sub(1);
                                    collection.storage_size =
                                        collection.storage_size.saturating_sub(record_size);
                                }
                            }
                            collection.storage_size =
                                collection.storage_size.saturating_sub(old_size);
                        }
                        ResourceKind::Record => {
                            bucket.record_count = bucket.record_count.saturating_sub(1);
                            collection.record_count = collection.record_count.saturating_sub(1);
                            collection.storage_size =
                                collection.storage_size.saturating_sub(old_size);
                        }
                        ResourceKind::Bucket | ResourceKind::Group => {}
                    }
                }
            }
        }

        let checked_collection = collection_uri.as_deref().map(|_| &collection);
        if let Some(breach) = aggregate_breach(&limits, &bucket, checked_collection) {
            return Err(self.reject(notification, &notification.uri, breach));
        }

        self.store.put_bucket_counters(&bucket_uri, &bucket)?;
        if let Some(uri) = collection_uri.as_deref() {
            if notification.action == ChangeAction::Delete
                && notification.resource == ResourceKind::Collection
            {
                self.store.delete_collection_counters(uri)?;
            } else {
                self.store.put_collection_counters(uri, &collection)?;
            }
        }

        debug!(
            bucket_id = %notification.bucket_id,
            resource = notification.resource.as_str(),
            storage_size = bucket.storage_size,
            record_count = bucket.record_count,
            "applied change notification"
        );
        Ok(())
    }

    /// A deleted bucket takes all of its counter records with it; its
    /// collections and records do not notify individually.
    fn remove_bucket(
        &self,
        notification: &ChangeNotification,
        bucket_uri: &str,
    ) -> Result<(), QuotaError> {
        self.store.delete_bucket_counters(bucket_uri)?;
        let pattern = event::collections_pattern(&notification.bucket_id);
        let removed = self.store.delete_collection_counters_matching(&pattern)?;
        debug!(
            bucket_id = %notification.bucket_id,
            removed_collections = removed,
            "dropped counters for deleted bucket"
        );
        Ok(())
    }

    fn resolve_limits(&self, notification: &ChangeNotification) -> EffectiveLimits {
        let bucket_id = &notification.bucket_id;
        let bucket_per_item = self
            .settings
            .bucket_limit(bucket_id, QuotaLimitName::MaxBytesPerItem);

        let (collection_max_bytes, collection_max_items, collection_per_item) =
            match notification.collection_id.as_deref() {
                Some(collection_id) => (
                    self.settings
                        .collection_limit(bucket_id, collection_id, QuotaLimitName::MaxBytes),
                    self.settings
                        .collection_limit(bucket_id, collection_id, QuotaLimitName::MaxItems),
                    self.settings.collection_limit(
                        bucket_id,
                        collection_id,
                        QuotaLimitName::MaxBytesPerItem,
                    ),
                ),
                None => (None, None, None),
            };

        let per_item_scope = if collection_per_item.is_some() {
            LimitScope::Collection
        } else {
            LimitScope::Bucket
        };

        EffectiveLimits {
            bucket_max_bytes: self.settings.bucket_limit(bucket_id, QuotaLimitName::MaxBytes),
            bucket_max_items: self.settings.bucket_limit(bucket_id, QuotaLimitName::MaxItems),
            collection_max_bytes,
            collection_max_items,
            max_bytes_per_item: collection_per_item.or(bucket_per_item),
            per_item_scope,
        }
    }

    fn reject(
        &self,
        notification: &ChangeNotification,
        uri: &str,
        breach: QuotaBreach,
    ) -> QuotaError {
        warn!(
            uri,
            bucket_id = %notification.bucket_id,
            scope = breach.scope.as_str(),
            limit = breach.limit.as_str(),
            maximum = breach.maximum,
            actual = breach.actual,
            "mutation rejected: quota exceeded"
        );
        QuotaError::Exceeded(breach)
    }
}

fn aggregate_breach(
    limits: &EffectiveLimits,
    bucket: &BucketCounters,
    collection: Option<&CollectionCounters>,
) -> Option<QuotaBreach> {
    if let Some(maximum) = limits.bucket_max_bytes {
        if bucket.storage_size > maximum {
            return Some(QuotaBreach {
                scope: LimitScope::Bucket,
                limit: QuotaLimitName::MaxBytes,
                maximum,
                actual: bucket.storage_size,
            });
        }
    }
    if let Some(maximum) = limits.bucket_max_items {
        if bucket.record_count > maximum {
            return Some(QuotaBreach {
                scope: LimitScope::Bucket,
                limit: QuotaLimitName::MaxItems,
                maximum,
                actual: bucket.record_count,
            });
        }
    }
    if let Some(collection) = collection {
        if let Some(maximum) = limits.collection_max_bytes {
            if collection.storage_size > maximum {
                return Some(QuotaBreach {
                    scope: LimitScope::Collection,
                    limit: QuotaLimitName::MaxBytes,
                    maximum,
                    actual: collection.storage_size,
                });
            }
        }
        if let Some(maximum) = limits.collection_max_items {
            if collection.record_count > maximum {
                return Some(QuotaBreach {
                    scope: LimitScope::Collection,
                    limit: QuotaLimitName::MaxItems,
                    maximum,
                    actual: collection.record_count,
                });
            }
        }
    }
    None
}
