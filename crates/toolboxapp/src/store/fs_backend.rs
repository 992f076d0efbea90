use super::backend::{StorageEstimate, StructuredBackend};
use super::flat::FlatStore;
use crate::error::{Result, ToolboxError};
use crate::model::{CollectionSpec, Envelope};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

type CollectionMap = BTreeMap<String, Envelope<Value>>;

/// Filesystem structured backend: one JSON document per collection.
pub struct FsBackend {
    root: PathBuf,
    quota_bytes: u64,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            quota_bytes: 10 * 1024 * 1024 * 1024,
        }
    }

    /// Quota reported by `estimate`; filesystems have no per-app quota to query.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_filename(name)))
    }

    fn load_collection(&self, name: &str) -> Result<CollectionMap> {
        read_json_or_default(&self.collection_path(name))
    }

    fn save_collection(&self, name: &str, records: &CollectionMap) -> Result<()> {
        write_json_atomic(&self.root, &self.collection_path(name), records)
    }
}

impl StructuredBackend for FsBackend {
    fn open(&self, schema: &[CollectionSpec]) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            ToolboxError::StorageUnavailable(format!("{}: {}", self.root.display(), e))
        })?;
        for spec in schema {
            self.ensure_collection(&spec.name)?;
        }
        write_json_atomic(&self.root, &self.root.join("schema.json"), &schema)
    }

    fn ensure_collection(&self, name: &str) -> Result<()> {
        let path = self.collection_path(name);
        if !path.exists() {
            self.save_collection(name, &CollectionMap::new())?;
        }
        Ok(())
    }

    fn put(&self, collection: &str, record: &Envelope<Value>) -> Result<()> {
        let mut records = self.load_collection(collection)?;
        records.insert(record.id.clone(), record.clone());
        self.save_collection(collection, &records)
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Envelope<Value>>> {
        let mut records = self.load_collection(collection)?;
        Ok(records.remove(key))
    }

    fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let mut records = self.load_collection(collection)?;
        if records.remove(key).is_some() {
            self.save_collection(collection, &records)?;
        }
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<Envelope<Value>>> {
        Ok(self.load_collection(collection)?.into_values().collect())
    }

    fn clear(&self, collection: &str) -> Result<()> {
        self.save_collection(collection, &CollectionMap::new())
    }

    fn estimate(&self) -> Option<StorageEstimate> {
        let usage = match fs::read_dir(&self.root) {
            Ok(entries) => entries
                .flatten()
                .filter_map(|entry| entry.metadata().ok())
                .filter(|meta| meta.is_file())
                .map(|meta| meta.len())
                .sum(),
            Err(_) => 0,
        };
        Some(StorageEstimate {
            usage,
            quota: self.quota_bytes,
        })
    }
}

/// Filesystem flat-key store: a single JSON object of string values.
pub struct FsFlatStore {
    path: PathBuf,
}

impl FsFlatStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        read_json_or_default(&self.path)
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        write_json_atomic(&dir, &self.path, items)
    }
}

impl FlatStore for FsFlatStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.save(&items)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(ToolboxError::Io)?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&content).map_err(ToolboxError::Serialization)
}

fn write_json_atomic<T: Serialize + ?Sized>(dir: &Path, target: &Path, value: &T) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(ToolboxError::Io)?;
    }
    let content = serde_json::to_string_pretty(value).map_err(ToolboxError::Serialization)?;

    // Atomic write: tmp file then rename
    let tmp = dir.join(format!(".write-{}.tmp", Uuid::new_v4()));
    fs::write(&tmp, content).map_err(ToolboxError::Io)?;
    fs::rename(&tmp, target).map_err(ToolboxError::Io)?;
    Ok(())
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize_filename("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_filename("customResources"), "customResources");
    }
}
