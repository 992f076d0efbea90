use crate::error::Result;

/// Abstract interface for the flat string-keyed store.
///
/// Values are opaque strings; the core stores JSON in them.
pub trait FlatStore {
    /// Returns Ok(None) if the key does not exist.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key is a no-op.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys currently present.
    fn keys(&self) -> Result<Vec<String>>;
}
