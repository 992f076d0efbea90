use super::backend::{StorageEstimate, StructuredBackend};
use super::flat::FlatStore;
use crate::error::{Result, ToolboxError};
use crate::model::{CollectionSpec, Envelope};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

/// In-memory structured backend.
///
/// Uses `RefCell` for interior mutability since the toolbox is single-threaded.
/// This keeps the `StructuredBackend` trait on `&self` for all methods.
#[derive(Default)]
pub struct MemBackend {
    collections: RefCell<HashMap<String, HashMap<String, Envelope<Value>>>>,
    open_calls: Cell<usize>,
    unavailable: Cell<bool>,
    simulate_write_error: Cell<bool>,
    simulate_read_error: Cell<bool>,
    quota: Cell<Option<u64>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose estimate facility reports `quota` bytes.
    pub fn with_quota(quota: u64) -> Self {
        let backend = Self::default();
        backend.quota.set(Some(quota));
        backend
    }

    /// Make `open` fail with `StorageUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }

    pub fn set_simulate_read_error(&self, simulate: bool) {
        self.simulate_read_error.set(simulate);
    }

    /// How many times `open` actually ran.
    pub fn open_calls(&self) -> usize {
        self.open_calls.get()
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.borrow().contains_key(name)
    }

    fn check_write(&self) -> Result<()> {
        if self.simulate_write_error.get() {
            return Err(ToolboxError::Store("Simulated write error".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if self.simulate_read_error.get() {
            return Err(ToolboxError::Store("Simulated read error".to_string()));
        }
        Ok(())
    }
}

impl StructuredBackend for MemBackend {
    fn open(&self, schema: &[CollectionSpec]) -> Result<()> {
        if self.unavailable.get() {
            return Err(ToolboxError::StorageUnavailable(
                "in-memory store disabled".to_string(),
            ));
        }
        self.open_calls.set(self.open_calls.get() + 1);
        let mut collections = self.collections.borrow_mut();
        for spec in schema {
            collections.entry(spec.name.clone()).or_default();
        }
        Ok(())
    }

    fn ensure_collection(&self, name: &str) -> Result<()> {
        self.collections
            .borrow_mut()
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    fn put(&self, collection: &str, record: &Envelope<Value>) -> Result<()> {
        self.check_write()?;
        self.collections
            .borrow_mut()
            .entry(collection.to_string())
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Envelope<Value>>> {
        self.check_read()?;
        let collections = self.collections.borrow();
        Ok(collections.get(collection).and_then(|c| c.get(key)).cloned())
    }

    fn delete(&self, collection: &str, key: &str) -> Result<()> {
        self.check_write()?;
        if let Some(records) = self.collections.borrow_mut().get_mut(collection) {
            records.remove(key);
        }
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<Envelope<Value>>> {
        self.check_read()?;
        let collections = self.collections.borrow();
        Ok(collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    fn clear(&self, collection: &str) -> Result<()> {
        self.check_write()?;
        if let Some(records) = self.collections.borrow_mut().get_mut(collection) {
            records.clear();
        }
        Ok(())
    }

    fn estimate(&self) -> Option<StorageEstimate> {
        let quota = self.quota.get()?;
        let usage = self
            .collections
            .borrow()
            .values()
            .flat_map(|c| c.values())
            .map(|env| serde_json::to_string(env).map(|s| s.len() as u64).unwrap_or(0))
            .sum();
        Some(StorageEstimate { usage, quota })
    }
}

/// In-memory flat-key store.
#[derive(Default)]
pub struct MemFlatStore {
    items: RefCell<BTreeMap<String, String>>,
    simulate_write_error: Cell<bool>,
}

impl MemFlatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, e.g. with legacy data in migration tests.
    pub fn with_items<K, V>(items: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::default();
        store
            .items
            .borrow_mut()
            .extend(items.into_iter().map(|(k, v)| (k.into(), v.into())));
        store
    }

    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl FlatStore for MemFlatStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error.get() {
            return Err(ToolboxError::Store("Simulated write error".to_string()));
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        if self.simulate_write_error.get() {
            return Err(ToolboxError::Store("Simulated write error".to_string()));
        }
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.borrow().keys().cloned().collect())
    }
}
