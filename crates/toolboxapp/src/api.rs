//! # API Facade
//!
//! [`Toolbox`] is the single entry point for UIs. It owns the shared storage
//! handles and hands out the component managers over them:
//!
//! - [`Toolbox::preferences`] / [`Toolbox::preferences_mut`]: the long-lived
//!   [`PreferenceManager`].
//! - [`Toolbox::identities`], [`Toolbox::resources`], [`Toolbox::games`]: cheap
//!   per-call views; they only clone `Rc` handles.
//! - [`Toolbox::migrator`] for administrative migration and restore.
//!
//! There is no global instance. Callers build one over whichever backends
//! they need:
//! - Production: `Toolbox<FsBackend, FsFlatStore>` (see [`crate::init`]).
//! - Testing: `Toolbox<MemBackend, MemFlatStore>`.

use crate::clock::{Clock, SystemClock};
use crate::config::ToolboxConfig;
use crate::error::Result;
use crate::games::GameStore;
use crate::migration::Migrator;
use crate::model::FlatKeys;
use crate::prefs::manager::{LoadSource, PreferenceManager};
use crate::quota::StorageReport;
use crate::records::academic::ResourceManager;
use crate::records::identity::IdentityManager;
use crate::store::backend::StructuredBackend;
use crate::store::flat::FlatStore;
use crate::store::kv::KvStore;
use log::warn;
use std::rc::Rc;

pub struct Toolbox<B: StructuredBackend, F: FlatStore> {
    kv: Rc<KvStore<B>>,
    flat: Rc<F>,
    clock: Rc<dyn Clock>,
    config: ToolboxConfig,
    keys: FlatKeys,
    prefs: PreferenceManager<B, F>,
}

impl<B: StructuredBackend, F: FlatStore> Toolbox<B, F> {
    pub fn new(backend: B, flat: F, config: ToolboxConfig) -> Self {
        Self::with_clock(backend, flat, config, Rc::new(SystemClock))
    }

    pub fn with_clock(backend: B, flat: F, config: ToolboxConfig, clock: Rc<dyn Clock>) -> Self {
        let kv = Rc::new(KvStore::new(backend, clock.clone()));
        let flat = Rc::new(flat);
        let prefs = PreferenceManager::new(kv.clone(), flat.clone(), clock.clone(), config.clone());
        Self {
            keys: FlatKeys::new(&config.namespace),
            kv,
            flat,
            clock,
            config,
            prefs,
        }
    }

    /// Load preferences (migrating if needed) and upgrade stored resources.
    pub fn start(&mut self) -> LoadSource {
        let source = self.prefs.load();
        if self.prefs.persistence_enabled() {
            if let Err(e) = self.resources().upgrade_all() {
                warn!("Resource schema upgrade failed: {}", e);
            }
        }
        source
    }

    pub fn preferences(&self) -> &PreferenceManager<B, F> {
        &self.prefs
    }

    pub fn preferences_mut(&mut self) -> &mut PreferenceManager<B, F> {
        &mut self.prefs
    }

    pub fn identities(&self) -> IdentityManager<B> {
        IdentityManager::new(self.kv.clone(), self.clock.clone())
    }

    pub fn resources(&self) -> ResourceManager<B> {
        ResourceManager::new(self.kv.clone(), self.clock.clone())
    }

    pub fn games(&self) -> GameStore<F> {
        GameStore::new(self.flat.clone(), self.keys.clone(), self.clock.clone())
    }

    pub fn migrator(&self) -> Migrator<B, F> {
        Migrator::new(
            self.kv.clone(),
            self.flat.clone(),
            self.keys.clone(),
            self.clock.clone(),
            self.config.migration_retry,
        )
    }

    /// Usage of both stores without touching the warning debounce.
    pub fn storage_report(&self) -> Result<StorageReport> {
        self.prefs.storage_report()
    }

    pub fn kv(&self) -> &KvStore<B> {
        &self.kv
    }

    pub fn flat(&self) -> &F {
        &self.flat
    }

    pub fn config(&self) -> &ToolboxConfig {
        &self.config
    }

    pub fn keys(&self) -> &FlatKeys {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::Game;
    use crate::model::Collection;
    use crate::quota::QuotaType;
    use crate::records::academic::AcademicResource;
    use crate::store::mem_backend::{MemBackend, MemFlatStore};
    use crate::test_utils::MemToolbox;
    use serde_json::json;

    fn with_quota(flat: MemFlatStore) -> MemToolbox {
        MemToolbox::build(MemBackend::with_quota(1_000_000), flat, ToolboxConfig::default())
    }

    #[test]
    fn start_on_fresh_install_uses_defaults() {
        let mut env = MemToolbox::new();
        assert_eq!(env.toolbox.start(), LoadSource::Defaults);
        assert!(env.toolbox.preferences().persistence_enabled());
    }

    #[test]
    fn start_migrates_legacy_preferences() {
        let mut env = MemToolbox::with_flat([("toolbox-preferences", r#"{"favoriteTools":["x"]}"#)]);
        assert_eq!(env.toolbox.start(), LoadSource::Structured);
        assert!(env.toolbox.preferences().preferences().is_favorite("x"));
        assert!(!env.toolbox.migrator().needs_migration().unwrap());
    }

    #[test]
    fn start_upgrades_v1_resources() {
        let mut env = MemToolbox::new();
        let resources = Collection::Custom("customResources".to_string());
        env.toolbox
            .kv()
            .set(
                &resources,
                "r1",
                &json!({"id": "r1", "name": "Old", "category": "journal"}),
            )
            .unwrap();
        env.toolbox.start();

        let raw = env
            .toolbox
            .kv()
            .get_envelope(&resources, "r1")
            .unwrap()
            .unwrap();
        assert_eq!(raw.data["iconName"], "book-open");
    }

    #[test]
    fn components_share_the_same_stores() {
        let mut env = MemToolbox::new();
        let toolbox = &mut env.toolbox;
        toolbox.start();
        toolbox
            .resources()
            .save(AcademicResource {
                name: "arXiv".to_string(),
                ..Default::default()
            })
            .unwrap();
        toolbox.games().record_result(Game::Tetris, 50, true).unwrap();

        assert_eq!(toolbox.resources().get_all().unwrap().len(), 1);
        assert!(toolbox
            .flat()
            .get_item("toolbox-game-tetris-stats")
            .unwrap()
            .is_some());
    }

    #[test]
    fn storage_report_covers_both_stores() {
        let mut env = with_quota(MemFlatStore::with_items([("toolbox-x", "abcd")]));
        env.toolbox.start();
        env.toolbox.preferences_mut().add_favorite("a").unwrap();

        let report = env.toolbox.storage_report().unwrap();
        assert!(report.structured.usage > 0);
        assert!(report.flat.usage >= 4);
        assert_eq!(report.flat.quota, 5 * 1024 * 1024);
    }

    #[test]
    fn storage_report_degrades_when_structured_store_is_down() {
        let backend = MemBackend::new();
        backend.set_unavailable(true);
        let mut env = MemToolbox::build(
            backend,
            MemFlatStore::with_items([("toolbox-x", "abcd")]),
            ToolboxConfig::default(),
        );
        env.toolbox.start();

        let report = env.toolbox.storage_report().unwrap();
        assert_eq!(report.structured.quota_type, QuotaType::Unknown);
        assert!(report.flat.usage >= 4);
    }
}
