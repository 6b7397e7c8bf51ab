//! Counter lifecycle tests for the quota engine

use std::sync::Arc;

use serde_json::{json, Value};

use coffer_quota_core::size::object_size;
use coffer_quota_core::{
    ChangeAction, ChangeNotification, ImpactedObject, MemoryStorage, QuotaEngine, QuotaSettings,
    ResourceKind,
};

#[test]
fn test_bucket_creation_is_tracked() {
    let (_, engine) = engine();
    let bucket = json!({"id": "blog", "owner": "alice"});

    engine
        .apply(&create(ResourceKind::Bucket, "/buckets/blog", "blog", None, &bucket))
        .expect("bucket creation should be accounted");

    let counters = engine.bucket_counters("blog").unwrap();
    assert_eq!(counters.storage_size, object_size(&bucket));
    assert_eq!(counters.collection_count, 0);
    assert_eq!(counters.record_count, 0);
}

#[test]
fn test_bucket_attribute_update_adjusts_size() {
    let (_, engine) = engine();
    let old = json!({"id": "blog"});
    let new = json!({"id": "blog", "description": "personal notes"});

    engine
        .apply(&create(ResourceKind::Bucket, "/buckets/blog", "blog", None, &old))
        .unwrap();
    engine
        .apply(&update(ResourceKind::Bucket, "/buckets/blog", "blog", None, &old, &new))
        .unwrap();

    let counters = engine.bucket_counters("blog").unwrap();
    assert_eq!(counters.storage_size, object_size(&new));
}

#[test]
fn test_collection_creation_is_tracked() {
    let (_, engine) = engine();
    let bucket = json!({"id": "blog"});
    let collection = json!({"id": "articles", "schema": {}});

    engine
        .apply(&create(ResourceKind::Bucket, "/buckets/blog", "blog", None, &bucket))
        .unwrap();
    engine
        .apply(&create(
            ResourceKind::Collection,
            "/buckets/blog/collections/articles",
            "blog",
            Some("articles"),
            &collection,
        ))
        .unwrap();

    let bucket_counters = engine.bucket_counters("blog").unwrap();
    assert_eq!(bucket_counters.collection_count, 1);
    assert_eq!(
        bucket_counters.storage_size,
        object_size(&bucket) + object_size(&collection)
    );

    let collection_counters = engine.collection_counters("blog", "articles").unwrap();
    assert_eq!(collection_counters.record_count, 0);
    assert_eq!(collection_counters.storage_size, object_size(&collection));
}

#[test]
fn test_record_creation_is_tracked_at_both_levels() {
    let (_, engine) = engine();
    let record = json!({"id": "r1", "title": "hello"});
    seed_hierarchy(&engine);

    engine
        .apply(&create(
            ResourceKind::Record,
            "/buckets/blog/collections/articles/records/r1",
            "blog",
            Some("articles"),
            &record,
        ))
        .unwrap();

    let bucket_counters = engine.bucket_counters("blog").unwrap();
    assert_eq!(bucket_counters.record_count, 1);

    let collection_counters = engine.collection_counters("blog", "articles").unwrap();
    assert_eq!(collection_counters.record_count, 1);
    assert_eq!(
        collection_counters.storage_size,
        seeded_collection_size() + object_size(&record)
    );
}

#[test]
fn test_record_update_applies_size_delta() {
    let (_, engine) = engine();
    seed_hierarchy(&engine);
    let old = json!({"id": "r1", "title": "hello"});
    let new = json!({"id": "r1", "title": "hello, but noticeably longer"});

    engine
        .apply(&create(
            ResourceKind::Record,
            "/buckets/blog/collections/articles/records/r1",
            "blog",
            Some("articles"),
            &old,
        ))
        .unwrap();
    let before = engine.bucket_counters("blog").unwrap();

    engine
        .apply(&update(
            ResourceKind::Record,
            "/buckets/blog/collections/articles/records/r1",
            "blog",
            Some("articles"),
            &old,
            &new,
        ))
        .unwrap();

    let after = engine.bucket_counters("blog").unwrap();
    assert_eq!(
        after.storage_size,
        before.storage_size - object_size(&old) + object_size(&new)
    );
    assert_eq!(after.record_count, before.record_count);

    let collection_counters = engine.collection_counters("blog", "articles").unwrap();
    assert_eq!(collection_counters.record_count, 1);
}

#[test]
fn test_record_delete_decrements_counters() {
    let (_, engine) = engine();
    seed_hierarchy(&engine);
    let record = json!({"id": "r1", "title": "hello"});

    engine
        .apply(&create(
            ResourceKind::Record,
            "/buckets/blog/collections/articles/records/r1",
            "blog",
            Some("articles"),
            &record,
        ))
        .unwrap();
    engine
        .apply(&delete(
            ResourceKind::Record,
            "/buckets/blog/collections/articles/records/r1",
            "blog",
            Some("articles"),
            &record,
        ))
        .unwrap();

    let bucket_counters = engine.bucket_counters("blog").unwrap();
    assert_eq!(bucket_counters.record_count, 0);
    assert_eq!(
        bucket_counters.storage_size,
        seeded_bucket_size() + seeded_collection_size()
    );

    let collection_counters = engine.collection_counters("blog", "articles").unwrap();
    assert_eq!(collection_counters.record_count, 0);
    assert_eq!(collection_counters.storage_size, seeded_collection_size());
}

#[test]
fn test_group_affects_bucket_size_only() {
    let (_, engine) = engine();
    let bucket = json!({"id": "blog"});
    let group = json!({"id": "editors", "members": ["alice", "bob"]});

    engine
        .apply(&create(ResourceKind::Bucket, "/buckets/blog", "blog", None, &bucket))
        .unwrap();
    engine
        .apply(&create(
            ResourceKind::Group,
            "/buckets/blog/groups/editors",
            "blog",
            None,
            &group,
        ))
        .unwrap();

    let counters = engine.bucket_counters("blog").unwrap();
    assert_eq!(
        counters.storage_size,
        object_size(&bucket) + object_size(&group)
    );
    assert_eq!(counters.record_count, 0);
    assert_eq!(counters.collection_count, 0);

    engine
        .apply(&delete(
            ResourceKind::Group,
            "/buckets/blog/groups/editors",
            "blog",
            None,
            &group,
        ))
        .unwrap();
    let counters = engine.bucket_counters("blog").unwrap();
    assert_eq!(counters.storage_size, object_size(&bucket));
}

#[test]
fn test_batch_creation_accumulates_every_item() {
    let (_, engine) = engine();
    seed_hierarchy(&engine);
    let first = json!({"id": "r1", "title": "one"});
    let second = json!({"id": "r2", "title": "two"});

    let batch = ChangeNotification {
        action: ChangeAction::Create,
        resource: ResourceKind::Record,
        uri: "/buckets/blog/collections/articles/records".to_string(),
        bucket_id: "blog".to_string(),
        collection_id: Some("articles".to_string()),
        impacted: vec![
            ImpactedObject {
                old: None,
                new: Some(first.clone()),
            },
            ImpactedObject {
                old: None,
                new: Some(second.clone()),
            },
        ],
    };
    engine.apply(&batch).unwrap();

    let bucket_counters = engine.bucket_counters("blog").unwrap();
    assert_eq!(bucket_counters.record_count, 2);

    let collection_counters = engine.collection_counters("blog", "articles").unwrap();
    assert_eq!(collection_counters.record_count, 2);
    assert_eq!(
        collection_counters.storage_size,
        seeded_collection_size() + object_size(&first) + object_size(&second)
    );
}

#[test]
fn test_unknown_bucket_reads_as_zeroed_counters() {
    let (_, engine) = engine();

    let counters = engine.bucket_counters("nowhere").unwrap();
    assert_eq!(counters.storage_size, 0);
    assert_eq!(counters.record_count, 0);

    let counters = engine.collection_counters("nowhere", "nothing").unwrap();
    assert_eq!(counters.record_count, 0);
}

#[test]
fn test_decrements_clamp_at_zero() {
    // A delete arriving with no tracked state must not wrap the counters.
    let (_, engine) = engine();
    let record = json!({"id": "ghost", "title": "was never counted"});

    engine
        .apply(&delete(
            ResourceKind::Record,
            "/buckets/blog/collections/articles/records/ghost",
            "blog",
            Some("articles"),
            &record,
        ))
        .unwrap();

    let bucket_counters = engine.bucket_counters("blog").unwrap();
    assert_eq!(bucket_counters.record_count, 0);
    assert_eq!(bucket_counters.storage_size, 0);

    let collection_counters = engine.collection_counters("blog", "articles").unwrap();
    assert_eq!(collection_counters.record_count, 0);
    assert_eq!(collection_counters.storage_size, 0);
}

fn engine() -> (Arc<MemoryStorage>, QuotaEngine<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let engine = QuotaEngine::new(Arc::clone(&storage), QuotaSettings::default());
    (storage, engine)
}

fn seed_hierarchy(engine: &QuotaEngine<MemoryStorage>) {
    engine
        .apply(&create(
            ResourceKind::Bucket,
            "/buckets/blog",
            "blog",
            None,
            &json!({"id": "blog"}),
        ))
        .unwrap();
    engine
        .apply(&create(
            ResourceKind::Collection,
            "/buckets/blog/collections/articles",
            "blog",
            Some("articles"),
            &json!({"id": "articles"}),
        ))
        .unwrap();
}

fn seeded_bucket_size() -> u64 {
    object_size(&json!({"id": "blog"}))
}

fn seeded_collection_size() -> u64 {
    object_size(&json!({"id": "articles"}))
}

fn create(
    resource: ResourceKind,
    uri: &str,
    bucket_id: &str,
    collection_id: Option<&str>,
    new: &Value,
) -> ChangeNotification {
    ChangeNotification {
        action: ChangeAction::Create,
        resource,
        uri: uri.to_string(),
        bucket_id: bucket_id.to_string(),
        collection_id: collection_id.map(str::to_string),
        impacted: vec![ImpactedObject {
            old: None,
            new: Some(new.clone()),
        }],
    }
}

fn update(
    resource: ResourceKind,
    uri: &str,
    bucket_id: &str,
    collection_id: Option<&str>,
    old: &Value,
    new: &Value,
) -> ChangeNotification {
    ChangeNotification {
        action: ChangeAction::Update,
        resource,
        uri: uri.to_string(),
        bucket_id: bucket_id.to_string(),
        collection_id: collection_id.map(str::to_string),
        impacted: vec![ImpactedObject {
            old: Some(old.clone()),
            new: Some(new.clone()),
        }],
    }
}

fn delete(
    resource: ResourceKind,
    uri: &str,
    bucket_id: &str,
    collection_id: Option<&str>,
    old: &Value,
) -> ChangeNotification {
    ChangeNotification {
        action: ChangeAction::Delete,
        resource,
        uri: uri.to_string(),
        bucket_id: bucket_id.to_string(),
        collection_id: collection_id.map(str::to_string),
        impacted: vec![ImpactedObject {
            old: Some(old.clone()),
            new: None,
        }],
    }
}
