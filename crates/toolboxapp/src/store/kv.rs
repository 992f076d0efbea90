//! # KV Store Adapter
//!
//! [`KvStore`] is the only way the rest of the crate talks to a
//! [`StructuredBackend`]. It adds:
//!
//! - **Lazy init**: every operation opens the backend on first use. `init` is
//!   idempotent and a failed open propagates to the caller instead of being
//!   swallowed.
//! - **Envelopes**: values are wrapped on `set` (timestamp stamped at write
//!   time) and unwrapped on `get`.
//! - **Error classification**: backend failures become `WriteFailed` or
//!   `ReadFailed`; `StorageUnavailable` passes through untouched.
//! - **Secondary indexes**: lookups by the key paths declared in the schema.

use super::backend::StructuredBackend;
use crate::clock::Clock;
use crate::error::{Result, ToolboxError};
use crate::model::{default_schema, Collection, CollectionSpec, Envelope};
use crate::quota::QuotaInfo;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

pub struct KvStore<B: StructuredBackend> {
    backend: B,
    schema: Vec<CollectionSpec>,
    opened: Cell<bool>,
    known_custom: RefCell<HashSet<String>>,
    clock: Rc<dyn Clock>,
}

impl<B: StructuredBackend> KvStore<B> {
    pub fn new(backend: B, clock: Rc<dyn Clock>) -> Self {
        Self::with_schema(backend, default_schema(), clock)
    }

    pub fn with_schema(backend: B, schema: Vec<CollectionSpec>, clock: Rc<dyn Clock>) -> Self {
        Self {
            backend,
            schema,
            opened: Cell::new(false),
            known_custom: RefCell::new(HashSet::new()),
            clock,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_open(&self) -> bool {
        self.opened.get()
    }

    /// Open the backend and create the declared collections. Idempotent.
    pub fn init(&self) -> Result<()> {
        if self.opened.get() {
            return Ok(());
        }
        self.backend.open(&self.schema)?;
        self.opened.set(true);
        info!(
            "Structured store opened with {} collections",
            self.schema.len()
        );
        Ok(())
    }

    fn ensure(&self, collection: &Collection) -> Result<()> {
        self.init()?;
        if let Collection::Custom(name) = collection {
            if !self.known_custom.borrow().contains(name) {
                self.backend
                    .ensure_collection(name)
                    .map_err(|e| write_failed(collection, "*", e))?;
                self.known_custom.borrow_mut().insert(name.clone());
            }
        }
        Ok(())
    }

    /// Wrap `value` in an envelope and write it, replacing any existing record.
    pub fn set<T: Serialize>(&self, collection: &Collection, key: &str, value: &T) -> Result<()> {
        self.ensure(collection)?;
        let data = serde_json::to_value(value)?;
        let envelope = Envelope::new(key, data, self.clock.now_ms());
        self.backend
            .put(collection.name(), &envelope)
            .map_err(|e| write_failed(collection, key, e))?;
        debug!("Stored {}/{}", collection, key);
        Ok(())
    }

    /// Unwrapped value at `key`, or None when absent.
    pub fn get<T: DeserializeOwned>(&self, collection: &Collection, key: &str) -> Result<Option<T>> {
        match self.get_envelope(collection, key)? {
            Some(envelope) => Ok(Some(serde_json::from_value(envelope.data)?)),
            None => Ok(None),
        }
    }

    pub fn get_envelope(&self, collection: &Collection, key: &str) -> Result<Option<Envelope<Value>>> {
        self.ensure(collection)?;
        self.backend
            .get(collection.name(), key)
            .map_err(|e| read_failed(collection, e))
    }

    pub fn delete(&self, collection: &Collection, key: &str) -> Result<()> {
        self.ensure(collection)?;
        self.backend
            .delete(collection.name(), key)
            .map_err(|e| write_failed(collection, key, e))
    }

    /// Every envelope in the collection, unordered.
    pub fn get_all(&self, collection: &Collection) -> Result<Vec<Envelope<Value>>> {
        self.ensure(collection)?;
        self.backend
            .list(collection.name())
            .map_err(|e| read_failed(collection, e))
    }

    pub fn clear(&self, collection: &Collection) -> Result<()> {
        self.ensure(collection)?;
        self.backend
            .clear(collection.name())
            .map_err(|e| write_failed(collection, "*", e))
    }

    /// Records whose indexed key path equals `value`.
    pub fn find_by_index(
        &self,
        collection: &Collection,
        index: &str,
        value: &str,
    ) -> Result<Vec<Envelope<Value>>> {
        let spec = self
            .schema
            .iter()
            .find(|s| s.name == collection.name())
            .and_then(|s| s.indexes.iter().find(|i| i.name == index))
            .cloned()
            .ok_or_else(|| {
                ToolboxError::ValidationFailed(format!(
                    "No index '{}' on collection '{}'",
                    index, collection
                ))
            })?;

        Ok(self
            .get_all(collection)?
            .into_iter()
            .filter(|env| spec.lookup(env).and_then(Value::as_str) == Some(value))
            .collect())
    }

    /// Usage and quota of the structured store.
    ///
    /// A positive `custom_quota` replaces the backend quota when
    /// `use_custom_quota` is set. No estimate yields a zeroed `unknown` result.
    pub fn get_storage_info(
        &self,
        custom_quota: Option<u64>,
        use_custom_quota: bool,
    ) -> Result<QuotaInfo> {
        self.init()?;
        Ok(QuotaInfo::resolve(
            self.backend.estimate(),
            custom_quota,
            use_custom_quota,
        ))
    }
}

fn write_failed(collection: &Collection, key: &str, err: ToolboxError) -> ToolboxError {
    match err {
        ToolboxError::StorageUnavailable(_) => err,
        other => ToolboxError::WriteFailed {
            collection: collection.to_string(),
            key: key.to_string(),
            reason: other.to_string(),
        },
    }
}

fn read_failed(collection: &Collection, err: ToolboxError) -> ToolboxError {
    match err {
        ToolboxError::StorageUnavailable(_) => err,
        other => ToolboxError::ReadFailed {
            collection: collection.to_string(),
            reason: other.to_string(),
        },
    }
}
