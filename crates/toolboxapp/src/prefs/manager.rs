//! # Preference Manager
//!
//! Owns the single in-memory preferences record and its lifecycle:
//!
//! ```text
//! Uninitialized --load()--> Loading --> Ready
//! ```
//!
//! `load` runs migration when legacy data is waiting, then picks the first
//! usable source:
//!
//! 1. the record in the structured `preferences` collection,
//! 2. the flat-key mirror, which is written back to the structured store at once,
//! 3. defaults.
//!
//! Read errors fall through to the next source. If the structured store
//! cannot be opened at all, [`PreferenceManager::persistence_enabled`] reports
//! false for the rest of the session and changes only reach the flat-key
//! mirror, which the next start picks up.
//!
//! Every change goes through [`reduce`]. After a transition that changed the
//! record, the [`StoragePersister`] and any subscribed observers are notified.
//! Persistence failures are logged and never returned to the caller.
//!
//! Actions dispatched before `load` follow the configured [`EarlyCallPolicy`].

use super::action::{reduce, Action};
use super::model::{LayoutPatch, Preferences, SettingsPatch, StoragePatch};
use crate::clock::Clock;
use crate::config::{EarlyCallPolicy, ToolboxConfig};
use crate::error::{Result, ToolboxError};
use crate::migration::{MigrationMarker, Migrator, MIGRATION_VERSION};
use crate::model::{Collection, FlatKeys, PREFERENCES_RECORD_KEY};
use crate::quota::{self, QuotaInfo, QuotaWarning, StorageReport};
use crate::store::backend::StructuredBackend;
use crate::store::flat::FlatStore;
use crate::store::kv::KvStore;
use log::{debug, info, warn};
use serde_json::Value;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Loading,
    Ready,
}

/// Where the record came from on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Structured,
    FlatMirror,
    Defaults,
}

impl LoadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadSource::Structured => "structured",
            LoadSource::FlatMirror => "flat-mirror",
            LoadSource::Defaults => "defaults",
        }
    }
}

pub trait PreferencesObserver {
    fn on_change(&self, prefs: &Preferences);
}

/// Writes every new record to the structured store and the flat mirror.
pub struct StoragePersister<B: StructuredBackend, F: FlatStore> {
    kv: Rc<KvStore<B>>,
    flat: Rc<F>,
    mirror_key: String,
    structured: bool,
}

impl<B: StructuredBackend, F: FlatStore> StoragePersister<B, F> {
    pub fn new(kv: Rc<KvStore<B>>, flat: Rc<F>, mirror_key: String) -> Self {
        Self {
            kv,
            flat,
            mirror_key,
            structured: true,
        }
    }

    /// Only write the flat mirror; the structured store never opened.
    pub fn mirror_only(mut self) -> Self {
        self.structured = false;
        self
    }
}

impl<B: StructuredBackend, F: FlatStore> PreferencesObserver for StoragePersister<B, F> {
    fn on_change(&self, prefs: &Preferences) {
        if self.structured {
            if let Err(e) = self
                .kv
                .set(&Collection::Preferences, PREFERENCES_RECORD_KEY, prefs)
            {
                warn!("Failed to persist preferences: {}", e);
            }
        }
        let mirrored = serde_json::to_string(prefs)
            .map_err(ToolboxError::from)
            .and_then(|json| self.flat.set_item(&self.mirror_key, &json));
        if let Err(e) = mirrored {
            warn!("Failed to mirror preferences: {}", e);
        }
    }
}

/// Outcome of a storage refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaCheck {
    pub report: StorageReport,
    pub warning: Option<QuotaWarning>,
}

pub struct PreferenceManager<B: StructuredBackend, F: FlatStore> {
    kv: Rc<KvStore<B>>,
    flat: Rc<F>,
    keys: FlatKeys,
    clock: Rc<dyn Clock>,
    config: ToolboxConfig,
    state: ManagerState,
    source: Option<LoadSource>,
    prefs: Preferences,
    /// Early actions with the time they were dispatched.
    pending: Vec<(Action, i64)>,
    structured: bool,
    persister: Option<StoragePersister<B, F>>,
    observers: Vec<Box<dyn PreferencesObserver>>,
}

impl<B: StructuredBackend, F: FlatStore> PreferenceManager<B, F> {
    pub fn new(
        kv: Rc<KvStore<B>>,
        flat: Rc<F>,
        clock: Rc<dyn Clock>,
        config: ToolboxConfig,
    ) -> Self {
        Self {
            kv,
            flat,
            keys: FlatKeys::new(&config.namespace),
            clock,
            config,
            state: ManagerState::Uninitialized,
            source: None,
            prefs: Preferences::default(),
            pending: Vec::new(),
            structured: false,
            persister: None,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn source(&self) -> Option<LoadSource> {
        self.source
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Whether the structured store is in use this session.
    pub fn persistence_enabled(&self) -> bool {
        self.structured
    }

    pub fn subscribe(&mut self, observer: Box<dyn PreferencesObserver>) {
        self.observers.push(observer);
    }

    fn migrator(&self) -> Migrator<B, F> {
        Migrator::new(
            self.kv.clone(),
            self.flat.clone(),
            self.keys.clone(),
            self.clock.clone(),
            self.config.migration_retry,
        )
    }

    /// Load the record. Calling it again once ready returns the first source.
    pub fn load(&mut self) -> LoadSource {
        if let (ManagerState::Ready, Some(source)) = (self.state, self.source) {
            return source;
        }
        self.state = ManagerState::Loading;

        let structured = match self.kv.init() {
            Ok(()) => true,
            Err(e) => {
                warn!("Structured store unavailable, preferences stay in memory: {}", e);
                false
            }
        };

        if structured {
            self.run_migration();
        }

        let (loaded, source) = self.load_record(structured);
        info!("Preferences loaded from {}", source.as_str());

        let persister = StoragePersister::new(
            self.kv.clone(),
            self.flat.clone(),
            self.keys.preferences.clone(),
        );
        self.structured = structured;
        self.persister = Some(if structured {
            persister
        } else {
            persister.mirror_only()
        });

        let replay = std::mem::take(&mut self.pending);
        let mut prefs = loaded;
        for (action, at) in &replay {
            prefs = reduce(&prefs, action, *at);
        }
        if !replay.is_empty() {
            debug!("Replayed {} early preference actions", replay.len());
        }
        self.prefs = prefs;
        self.source = Some(source);
        self.state = ManagerState::Ready;

        if source == LoadSource::FlatMirror || !replay.is_empty() {
            self.notify();
        }
        source
    }

    fn run_migration(&self) {
        let migrator = self.migrator();
        match migrator.needs_migration() {
            Ok(true) => match migrator.migrate() {
                Ok(result) if !result.success => warn!(
                    "Migration finished with {} errors",
                    result.errors.len()
                ),
                Ok(_) => {}
                Err(e) => warn!("Migration aborted: {}", e),
            },
            Ok(false) => {}
            Err(e) => warn!("Could not check migration status: {}", e),
        }
    }

    fn load_record(&self, structured: bool) -> (Preferences, LoadSource) {
        if structured {
            match self
                .kv
                .get::<Value>(&Collection::Preferences, PREFERENCES_RECORD_KEY)
            {
                Ok(Some(value)) => match Preferences::from_json_value(&value) {
                    Some(prefs) => return (prefs, LoadSource::Structured),
                    None => warn!("Stored preferences are not an object, ignoring"),
                },
                Ok(None) => {}
                Err(e) => warn!("Could not read stored preferences: {}", e),
            }
        }

        match self.flat.get_item(&self.keys.preferences) {
            Ok(Some(raw)) => match Preferences::from_json_str(&raw) {
                Some(prefs) => return (prefs, LoadSource::FlatMirror),
                None => warn!("Flat preferences mirror is unreadable, ignoring"),
            },
            Ok(None) => {}
            Err(e) => warn!("Could not read flat preferences mirror: {}", e),
        }

        if structured {
            self.mark_fresh_install();
        }
        (Preferences::default(), LoadSource::Defaults)
    }

    /// A fresh install has nothing to migrate; record that so the mirror
    /// written later is not mistaken for legacy data.
    fn mark_fresh_install(&self) {
        let migrator = self.migrator();
        if !matches!(migrator.marker(), Ok(None)) {
            return;
        }
        let marker = MigrationMarker {
            completed: true,
            timestamp: self.clock.now_ms(),
            version: MIGRATION_VERSION,
            migrated_items: 0,
            total_size: 0,
        };
        let written = serde_json::to_string(&marker)
            .map_err(ToolboxError::from)
            .and_then(|json| self.flat.set_item(&self.keys.migration_status, &json));
        if let Err(e) = written {
            warn!("Could not write migration marker: {}", e);
        }
    }

    fn notify(&self) {
        if let Some(persister) = &self.persister {
            persister.on_change(&self.prefs);
        }
        for observer in &self.observers {
            observer.on_change(&self.prefs);
        }
    }

    /// Apply one transition and notify observers if the record changed.
    pub fn dispatch(&mut self, action: Action) -> Result<&Preferences> {
        let now = self.clock.now_ms();

        if self.state != ManagerState::Ready {
            return match self.config.early_calls {
                EarlyCallPolicy::Reject => Err(ToolboxError::NotReady),
                EarlyCallPolicy::Queue => {
                    debug!("Queueing {} until preferences are loaded", action.name());
                    self.prefs = reduce(&self.prefs, &action, now);
                    self.pending.push((action, now));
                    Ok(&self.prefs)
                }
            };
        }

        let next = reduce(&self.prefs, &action, now);
        if next != self.prefs {
            debug!("Preferences changed by {}", action.name());
            self.prefs = next;
            self.notify();
        }
        Ok(&self.prefs)
    }

    pub fn add_favorite(&mut self, tool_id: &str) -> Result<&Preferences> {
        self.dispatch(Action::AddFavorite(tool_id.to_string()))
    }

    pub fn remove_favorite(&mut self, tool_id: &str) -> Result<&Preferences> {
        self.dispatch(Action::RemoveFavorite(tool_id.to_string()))
    }

    pub fn record_usage(&mut self, tool_id: &str) -> Result<&Preferences> {
        self.dispatch(Action::RecordUsage(tool_id.to_string()))
    }

    pub fn add_search_history(&mut self, term: &str) -> Result<&Preferences> {
        self.dispatch(Action::AddSearchHistory(term.to_string()))
    }

    pub fn clear_search_history(&mut self) -> Result<&Preferences> {
        self.dispatch(Action::ClearSearchHistory)
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<&Preferences> {
        self.dispatch(Action::UpdateSettings(patch))
    }

    pub fn update_layout(&mut self, patch: LayoutPatch) -> Result<&Preferences> {
        self.dispatch(Action::UpdateLayout(patch))
    }

    pub fn update_storage(&mut self, patch: StoragePatch) -> Result<&Preferences> {
        self.dispatch(Action::UpdateStorage(patch))
    }

    pub fn clear_all(&mut self) -> Result<&Preferences> {
        self.dispatch(Action::ClearAll)
    }

    /// Pretty JSON of the current record.
    pub fn export_snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.prefs)?)
    }

    /// Replace the record with `blob` merged onto defaults.
    ///
    /// Returns false for anything that is not a JSON object.
    pub fn import_snapshot(&mut self, blob: &str) -> bool {
        let Some(prefs) = Preferences::from_json_str(blob) else {
            warn!("Rejected preferences import: not a JSON object");
            return false;
        };
        self.dispatch(Action::Replace(Box::new(prefs))).is_ok()
    }

    /// Usage of both stores against the current storage settings.
    ///
    /// The structured figures read as unknown when that store is not in use
    /// or its estimate fails.
    pub fn storage_report(&self) -> Result<StorageReport> {
        let storage = &self.prefs.storage;
        let structured = if self.persistence_enabled() {
            self.kv
                .get_storage_info(Some(storage.custom_quota), storage.use_custom_quota)
                .unwrap_or_else(|e| {
                    warn!("Storage estimate failed: {}", e);
                    QuotaInfo::unknown()
                })
        } else {
            QuotaInfo::unknown()
        };
        let flat = quota::flat_usage(self.flat.as_ref(), &self.keys, self.config.flat_quota_bytes)?;
        Ok(StorageReport { structured, flat })
    }

    /// Measure both stores and raise the quota warning when it is due.
    ///
    /// A raised warning stamps `last_warning_time` through the normal
    /// transition path, which starts the debounce window.
    pub fn refresh_storage(&mut self) -> Result<QuotaCheck> {
        let report = self.storage_report()?;

        let now = self.clock.now_ms();
        let warning = quota::should_warn(
            &report.structured,
            &self.prefs.storage,
            now,
            self.config.warning_interval_ms(),
        );
        if let Some(w) = &warning {
            warn!(
                "Storage usage at {:.1}% of quota (warning threshold {}%)",
                w.percentage, w.threshold
            );
            self.update_storage(StoragePatch {
                last_warning_time: Some(now),
                ..Default::default()
            })?;
        }
        Ok(QuotaCheck { report, warning })
    }
}
