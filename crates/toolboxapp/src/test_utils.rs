use crate::api::Toolbox;
use crate::clock::ManualClock;
use crate::config::ToolboxConfig;
use crate::store::mem_backend::{MemBackend, MemFlatStore};
use std::rc::Rc;

/// Start time of every test clock: an arbitrary, non-zero instant.
pub const TEST_EPOCH_MS: i64 = 1_700_000_000_000;

/// A fully in-memory toolbox with a hand-driven clock.
pub struct MemToolbox {
    pub toolbox: Toolbox<MemBackend, MemFlatStore>,
    pub clock: Rc<ManualClock>,
}

impl Default for MemToolbox {
    fn default() -> Self {
        Self::new()
    }
}

impl MemToolbox {
    pub fn new() -> Self {
        Self::build(MemBackend::new(), MemFlatStore::new(), ToolboxConfig::default())
    }

    /// Seed the flat store, e.g. with legacy keys.
    pub fn with_flat<K, V>(items: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::build(
            MemBackend::new(),
            MemFlatStore::with_items(items),
            ToolboxConfig::default(),
        )
    }

    pub fn build(backend: MemBackend, flat: MemFlatStore, config: ToolboxConfig) -> Self {
        let clock = Rc::new(ManualClock::new(TEST_EPOCH_MS));
        let toolbox = Toolbox::with_clock(backend, flat, config, clock.clone());
        Self { toolbox, clock }
    }
}
