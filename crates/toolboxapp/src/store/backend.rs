use crate::error::Result;
use crate::model::{CollectionSpec, Envelope};
use serde_json::Value;

/// Usage and quota as reported by the backend's estimate facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    pub usage: u64,
    pub quota: u64,
}

/// Abstract interface for the structured, collection-based store.
///
/// Each single call is atomic with respect to its collection. There is no
/// multi-call transaction; callers that read-modify-write get last-write-wins.
pub trait StructuredBackend {
    /// Open (creating on first use) the store with the given collections.
    /// Must be idempotent. Fails with `StorageUnavailable` when the store
    /// cannot be reached at all.
    fn open(&self, schema: &[CollectionSpec]) -> Result<()>;

    /// Make sure an ad hoc collection exists.
    fn ensure_collection(&self, name: &str) -> Result<()>;

    /// Write an envelope, replacing any envelope with the same id.
    fn put(&self, collection: &str, record: &Envelope<Value>) -> Result<()>;

    /// Returns Ok(None) for a missing key; Err only on real failures.
    fn get(&self, collection: &str, key: &str) -> Result<Option<Envelope<Value>>>;

    /// Remove a record. Absent keys are not an error.
    fn delete(&self, collection: &str, key: &str) -> Result<()>;

    /// Every envelope in a collection, in no particular order.
    fn list(&self, collection: &str) -> Result<Vec<Envelope<Value>>>;

    /// Remove every record in a collection.
    fn clear(&self, collection: &str) -> Result<()>;

    /// Usage/quota estimate, or None when the backend cannot tell.
    fn estimate(&self) -> Option<StorageEstimate>;
}
