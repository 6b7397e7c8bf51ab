use std::collections::BTreeMap;

use thiserror::Error;

/// Names of the configurable quota ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLimitName {
    MaxBytes,
    MaxItems,
    MaxBytesPerItem,
}

impl QuotaLimitName {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaLimitName::MaxBytes => "max_bytes",
            QuotaLimitName::MaxItems => "max_items",
            QuotaLimitName::MaxBytesPerItem => "max_bytes_per_item",
        }
    }
}

/// Raised when a `quotas.*` settings entry carries a value that is not a
/// non-negative integer.
#[derive(Debug, Error)]
#[error("invalid quota setting {key}: {reason}")]
pub struct InvalidSetting {
    pub key: String,
    pub reason: String,
}

/// The ceilings configured for one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LimitSet {
    max_bytes: Option<u64>,
    max_items: Option<u64>,
    max_bytes_per_item: Option<u64>,
}

impl LimitSet {
    fn get(&self, name: QuotaLimitName) -> Option<u64> {
        match name {
            QuotaLimitName::MaxBytes => self.max_bytes,
            QuotaLimitName::MaxItems => self.max_items,
            QuotaLimitName::MaxBytesPerItem => self.max_bytes_per_item,
        }
    }

    fn set(&mut self, name: QuotaLimitName, value: u64) {
        match name {
            QuotaLimitName::MaxBytes => self.max_bytes = Some(value),
            QuotaLimitName::MaxItems => self.max_items = Some(value),
            QuotaLimitName::MaxBytesPerItem => self.max_bytes_per_item = Some(value),
        }
    }
}

/// Quota configuration, built once from the host's flat settings map and
/// consulted through scope-specific override chains.
///
/// Recognized keys, with `{limit}` one of `max_bytes`, `max_items`,
/// `max_bytes_per_item`:
///
/// - `quotas.bucket_{limit}`: default for every bucket
/// - `quotas.bucket_{bucket_id}_{limit}`: override for one bucket
/// - `quotas.collection_{limit}`: default for every collection
/// - `quotas.collection_{bucket_id}_{limit}`: default for the collections
///   of one bucket
/// - `quotas.collection_{bucket_id}_{collection_id}_{limit}`: override for
///   one collection
///
/// Keys outside the `quotas.` prefix or not matching the convention are
/// ignored. A limit absent at every level means unlimited.
#[derive(Debug, Clone, Default)]
pub struct QuotaSettings {
    bucket_default: LimitSet,
    bucket_overrides: BTreeMap<String, LimitSet>,
    collection_default: LimitSet,
    collection_bucket_defaults: BTreeMap<String, LimitSet>,
    collection_overrides: BTreeMap<(String, String), LimitSet>,
}

impl QuotaSettings {
    /// Builds the structured configuration from flat `key = value` entries.
    pub fn from_flat_map<I, K, V>(entries: I) -> Result<Self, InvalidSetting>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();

        for (key, value) in entries {
            let key = key.as_ref();
            let Some(scoped) = key.strip_prefix("quotas.") else {
                continue;
            };
            let (is_bucket_scope, rest) = if let Some(rest) = scoped.strip_prefix("bucket_") {
                (true, rest)
            } else if let Some(rest) = scoped.strip_prefix("collection_") {
                (false, rest)
            } else {
                continue;
            };
            let Some((middle, name)) = split_limit_suffix(rest) else {
                continue;
            };

            let value = value.as_ref();
            let parsed: u64 = value.trim().parse().map_err(|_| InvalidSetting {
                key: key.to_string(),
                reason: format!("expected a non-negative integer, got {value:?}"),
            })?;

            if is_bucket_scope {
                if middle.is_empty() {
                    settings.bucket_default.set(name, parsed);
                } else {
                    settings
                        .bucket_overrides
                        .entry(middle.to_string())
                        .or_default()
                        .set(name, parsed);
                }
            } else if middle.is_empty() {
                settings.collection_default.set(name, parsed);
            } else if let Some((bucket_id, collection_id)) = middle.split_once('_') {
                settings
                    .collection_overrides
                    .entry((bucket_id.to_string(), collection_id.to_string()))
                    .or_default()
                    .set(name, parsed);
            } else {
                settings
                    .collection_bucket_defaults
                    .entry(middle.to_string())
                    .or_default()
                    .set(name, parsed);
            }
        }

        Ok(settings)
    }

    /// Effective bucket-scope limit: per-bucket override, then the global
    /// bucket default.
    pub fn bucket_limit(&self, bucket_id: &str, name: QuotaLimitName) -> Option<u64> {
        self.bucket_overrides
            .get(bucket_id)
            .and_then(|set| set.get(name))
            .or_else(|| self.bucket_default.get(name))
    }

    /// Effective collection-scope limit: per-collection override, then the
    /// bucket-wide collection default, then the global collection default.
    pub fn collection_limit(
        &self,
        bucket_id: &str,
        collection_id: &str,
        name: QuotaLimitName,
    ) -> Option<u64> {
        self.collection_overrides
            .get(&(bucket_id.to_string(), collection_id.to_string()))
            .and_then(|set| set.get(name))
            .or_else(|| {
                self.collection_bucket_defaults
                    .get(bucket_id)
                    .and_then(|set| set.get(name))
            })
            .or_else(|| self.collection_default.get(name))
    }
}

fn split_limit_suffix(rest: &str) -> Option<(&str, QuotaLimitName)> {
    for name in [
        QuotaLimitName::MaxBytesPerItem,
        QuotaLimitName::MaxItems,
        QuotaLimitName::MaxBytes,
    ] {
        if rest == name.as_str() {
            return Some(("", name));
        }
        if let Some(middle) = rest
            .strip_suffix(name.as_str())
            .and_then(|middle| middle.strip_suffix('_'))
        {
            return Some((middle, name));
        }
    }
    None
}
