//! # Storage Model: Envelopes, Collections and Flat Keys
//!
//! Every value written to the structured store is wrapped in an [`Envelope`]:
//!
//! ```text
//! { "id": "user-preferences", "data": { ... }, "timestamp": 1700000000000,
//!   "version": 1, "compressed": false }
//! ```
//!
//! - `id` is the caller-supplied logical key.
//! - `timestamp` is stamped at write time on every `set`.
//! - `version` is [`ENVELOPE_VERSION`]; no envelope-level schema evolution exists.
//! - `compressed` is carried for format compatibility and is always `false`.
//!
//! ## Collections
//!
//! The structured store is split into named, isolated collections. The built-in
//! ones are closed over by [`Collection`]; ad hoc collections (custom resource
//! lists, for example) use [`Collection::Custom`].
//!
//! ## Flat Keys
//!
//! The flat-key store holds a handful of namespaced JSON blobs. [`FlatKeys`]
//! derives all of them from the configured namespace so no call site builds a
//! key by string concatenation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const ENVELOPE_VERSION: u32 = 1;

/// Key of the single preferences record inside [`Collection::Preferences`].
pub const PREFERENCES_RECORD_KEY: &str = "user-preferences";

/// Secondary index over identity profiles by US state abbreviation.
pub const BY_STATE_INDEX: &str = "by_state";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub id: String,
    pub data: T,
    pub timestamp: i64,
    pub version: u32,
    #[serde(default)]
    pub compressed: bool,
}

impl<T> Envelope<T> {
    pub fn new(id: impl Into<String>, data: T, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            data,
            timestamp,
            version: ENVELOPE_VERSION,
            compressed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    Preferences,
    Backups,
    Cache,
    IdentityProfiles,
    IdentitySettings,
    Custom(String),
}

impl Collection {
    pub const BUILTIN: [Collection; 5] = [
        Collection::Preferences,
        Collection::Backups,
        Collection::Cache,
        Collection::IdentityProfiles,
        Collection::IdentitySettings,
    ];

    pub fn name(&self) -> &str {
        match self {
            Collection::Preferences => "preferences",
            Collection::Backups => "backups",
            Collection::Cache => "cache",
            Collection::IdentityProfiles => "identityProfiles",
            Collection::IdentitySettings => "identitySettings",
            Collection::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Collection::Custom(_))
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A secondary index declared when the store is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSpec {
    pub name: String,
    /// Dotted path into the envelope, e.g. `data.address.stateAbbreviation`.
    pub key_path: String,
}

impl IndexSpec {
    pub fn new(name: &str, key_path: &str) -> Self {
        Self {
            name: name.to_string(),
            key_path: key_path.to_string(),
        }
    }

    /// Resolve the indexed value inside an envelope, if present.
    pub fn lookup<'a>(&self, envelope: &'a Envelope<Value>) -> Option<&'a Value> {
        let path = self.key_path.strip_prefix("data.")?;
        let pointer = format!("/{}", path.replace('.', "/"));
        envelope.data.pointer(&pointer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSpec {
    pub name: String,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            indexes: Vec::new(),
        }
    }
}

/// Collections and indexes created on first open.
pub fn default_schema() -> Vec<CollectionSpec> {
    Collection::BUILTIN
        .iter()
        .map(|collection| match collection {
            Collection::IdentityProfiles => CollectionSpec {
                name: collection.name().to_string(),
                indexes: vec![IndexSpec::new(
                    BY_STATE_INDEX,
                    "data.address.stateAbbreviation",
                )],
            },
            other => CollectionSpec::plain(other.name()),
        })
        .collect()
}

/// Every flat key the core reads or writes, derived from one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatKeys {
    pub namespace: String,
    pub preferences: String,
    pub migration_status: String,
    pub pre_migration_backup: String,
    pub translation_cache: String,
}

impl FlatKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            preferences: format!("{namespace}preferences"),
            migration_status: format!("{namespace}migration-status"),
            pre_migration_backup: format!("{namespace}pre-migration-backup"),
            translation_cache: format!("{namespace}translation-cache"),
        }
    }

    pub fn in_namespace(&self, key: &str) -> bool {
        key.starts_with(&self.namespace)
    }

    /// Keys owned by the core itself; migration never copies these as legacy data.
    pub fn is_bookkeeping(&self, key: &str) -> bool {
        key == self.preferences || key == self.migration_status || key == self.pre_migration_backup
    }
}
