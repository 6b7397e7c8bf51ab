use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mutation kind carried by a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

/// Resource kind within the bucket hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Bucket,
    Collection,
    Record,
    Group,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Bucket => "bucket",
            ResourceKind::Collection => "collection",
            ResourceKind::Record => "record",
            ResourceKind::Group => "group",
        }
    }
}

/// One impacted entry of a batch notification. Deletes carry only `old`,
/// creates only `new`, updates both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactedObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
}

/// A change notification dispatched by the host store after a mutation.
///
/// `collection_id` is set for collection and record events and absent for
/// bucket and group events. Batch endpoints produce one [`ImpactedObject`]
/// per affected resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub action: ChangeAction,
    pub resource: ResourceKind,
    pub uri: String,
    pub bucket_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub impacted: Vec<ImpactedObject>,
}

/// Per-resource delta extracted from a notification.
#[derive(Debug, Clone)]
pub struct ChangeItem {
    pub uri: String,
    pub id: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl ChangeNotification {
    /// URI of the bucket this notification belongs to.
    pub fn bucket_uri(&self) -> String {
        bucket_uri(&self.bucket_id)
    }

    /// URI of the collection this notification is scoped to, when any.
    pub fn collection_uri(&self) -> Option<String> {
        self.collection_id
            .as_deref()
            .map(|id| collection_uri(&self.bucket_id, id))
    }

    /// Expands the batch into one [`ChangeItem`] per impacted entry, keeping
    /// the order the host supplied.
    ///
    /// The id comes from `new` unless the action is a delete. Batch creation
    /// endpoints notify with a URI that lacks the newly assigned id, so the
    /// id is appended unless the URI already ends with it.
    pub fn normalized_items(&self) -> Vec<ChangeItem> {
        self.impacted
            .iter()
            .map(|impacted| {
                let target = match self.action {
                    ChangeAction::Delete => impacted.old.as_ref(),
                    _ => impacted.new.as_ref(),
                };
                let id = target
                    .and_then(|value| value.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let uri = if self.uri.ends_with(&id) {
                    self.uri.clone()
                } else {
                    format!("{}/{}", self.uri, id)
                };
                ChangeItem {
                    uri,
                    id,
                    old: impacted.old.clone(),
                    new: impacted.new.clone(),
                }
            })
            .collect()
    }
}

pub fn bucket_uri(bucket_id: &str) -> String {
    format!("/buckets/{bucket_id}")
}

pub fn collection_uri(bucket_id: &str, collection_id: &str) -> String {
    format!("/buckets/{bucket_id}/collections/{collection_id}")
}

/// Glob matching every collection URI under the given bucket.
pub fn collections_pattern(bucket_id: &str) -> String {
    format!("/buckets/{bucket_id}/collections/*")
}
