//! # Migration
//!
//! Moves data written by older releases out of the flat-key store into the
//! structured store. It runs at most once per installation, gated by a marker
//! key, and never deletes the legacy keys it copies.
//!
//! ## Steps
//!
//! 1. Snapshot every flat key into one backup blob, written to the flat store
//!    and to the `backups` collection. This happens before anything else is
//!    touched; if the snapshot cannot be written, migration stops. A retried
//!    migration keeps the snapshot of the first attempt.
//! 2. Copy the legacy preferences blob, merged onto defaults, into the
//!    `preferences` collection.
//! 3. Copy every game-state key (known legacy prefixes) into `backups` as
//!    `legacy-<key>`.
//! 4. Copy every other namespaced key that is not core bookkeeping the same way.
//! 5. Write the marker with the item count and byte total.
//!
//! Per-item failures are collected into [`MigrationResult::errors`] and never
//! stop the remaining items. Whether a partial failure counts as complete is
//! the configured [`RetryPolicy`].
//!
//! [`Migrator::restore_pre_migration_data`] puts the snapshot back. It is an
//! administrative escape hatch and nothing calls it automatically.

use crate::clock::Clock;
use crate::config::RetryPolicy;
use crate::error::{Result, ToolboxError};
use crate::games::Game;
use crate::model::{Collection, FlatKeys, PREFERENCES_RECORD_KEY};
use crate::prefs::model::Preferences;
use crate::store::backend::StructuredBackend;
use crate::store::flat::FlatStore;
use crate::store::kv::KvStore;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

pub const MIGRATION_VERSION: u32 = 1;

/// Key of the snapshot inside [`Collection::Backups`].
pub const SNAPSHOT_BACKUP_KEY: &str = "pre-migration";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationMarker {
    pub completed: bool,
    pub timestamp: i64,
    pub version: u32,
    pub migrated_items: usize,
    pub total_size: u64,
}

/// Every flat key and value as they were right before migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreMigrationSnapshot {
    pub taken_at: i64,
    pub items: BTreeMap<String, String>,
}

/// A legacy flat value preserved verbatim in `backups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyItem {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationError {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub success: bool,
    /// Nothing to migrate (no legacy data, or already marked complete).
    pub skipped: bool,
    pub migrated_items: usize,
    pub total_size: u64,
    pub migrated_keys: Vec<String>,
    pub errors: Vec<MigrationError>,
}

impl MigrationResult {
    fn record_ok(&mut self, key: &str, size: usize) {
        self.migrated_items += 1;
        self.total_size += size as u64;
        self.migrated_keys.push(key.to_string());
    }

    fn record_err(&mut self, key: &str, err: impl ToString) {
        let reason = err.to_string();
        warn!("Migration of '{}' failed: {}", key, reason);
        self.errors.push(MigrationError {
            key: key.to_string(),
            reason,
        });
    }
}

pub fn legacy_backup_key(flat_key: &str) -> String {
    format!("legacy-{flat_key}")
}

pub struct Migrator<B: StructuredBackend, F: FlatStore> {
    kv: Rc<KvStore<B>>,
    flat: Rc<F>,
    keys: FlatKeys,
    clock: Rc<dyn Clock>,
    retry: RetryPolicy,
}

impl<B: StructuredBackend, F: FlatStore> Migrator<B, F> {
    pub fn new(
        kv: Rc<KvStore<B>>,
        flat: Rc<F>,
        keys: FlatKeys,
        clock: Rc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            kv,
            flat,
            keys,
            clock,
            retry,
        }
    }

    /// The stored marker; a missing or unparseable marker reads as None.
    pub fn marker(&self) -> Result<Option<MigrationMarker>> {
        let Some(raw) = self.flat.get_item(&self.keys.migration_status)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(marker) => Ok(Some(marker)),
            Err(e) => {
                warn!("Ignoring unreadable migration marker: {}", e);
                Ok(None)
            }
        }
    }

    /// Legacy preferences exist and no completed marker does.
    pub fn needs_migration(&self) -> Result<bool> {
        if self.flat.get_item(&self.keys.preferences)?.is_none() {
            return Ok(false);
        }
        Ok(!self.marker()?.is_some_and(|m| m.completed))
    }

    pub fn migrate(&self) -> Result<MigrationResult> {
        if !self.needs_migration()? {
            return Ok(MigrationResult {
                success: true,
                skipped: true,
                ..Default::default()
            });
        }

        info!("Migrating legacy flat-key data");
        let now = self.clock.now_ms();
        self.write_snapshot(now)?;

        let mut result = MigrationResult::default();

        let prefs_key = self.keys.preferences.clone();
        match self.migrate_preferences(&prefs_key) {
            Ok(size) => result.record_ok(&prefs_key, size),
            Err(e) => result.record_err(&prefs_key, e),
        }

        let all_keys = self.flat.keys()?;
        let (game_keys, other_keys): (Vec<String>, Vec<String>) = all_keys
            .into_iter()
            .filter(|k| !self.keys.is_bookkeeping(k))
            .partition(|k| Game::from_legacy_key(k).is_some());

        let namespaced = other_keys
            .into_iter()
            .filter(|k| self.keys.in_namespace(k));
        for key in game_keys.into_iter().chain(namespaced) {
            match self.copy_legacy_item(&key) {
                Ok(Some(size)) => result.record_ok(&key, size),
                Ok(None) => {}
                Err(e) => result.record_err(&key, e),
            }
        }

        result.success = result.errors.is_empty();
        let completed = result.success || self.retry == RetryPolicy::MarkComplete;
        let marker = MigrationMarker {
            completed,
            timestamp: now,
            version: MIGRATION_VERSION,
            migrated_items: result.migrated_items,
            total_size: result.total_size,
        };
        if let Err(e) = self
            .flat
            .set_item(&self.keys.migration_status, &serde_json::to_string(&marker)?)
        {
            result.record_err(&self.keys.migration_status, e);
            result.success = false;
        }

        info!(
            "Migration finished: {} items, {} bytes, {} errors",
            result.migrated_items,
            result.total_size,
            result.errors.len()
        );
        Ok(result)
    }

    /// Take the snapshot unless an earlier attempt already did; the first one
    /// is the rollback point.
    fn write_snapshot(&self, now: i64) -> Result<()> {
        if self.flat.get_item(&self.keys.pre_migration_backup)?.is_some() {
            debug!("Keeping existing pre-migration snapshot");
            return Ok(());
        }
        match self
            .kv
            .get::<PreMigrationSnapshot>(&Collection::Backups, SNAPSHOT_BACKUP_KEY)
        {
            Ok(Some(existing)) => {
                debug!("Restoring flat copy of pre-migration snapshot from backups");
                return self.flat.set_item(
                    &self.keys.pre_migration_backup,
                    &serde_json::to_string(&existing)?,
                );
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read backed-up snapshot: {}", e),
        }

        let mut items = BTreeMap::new();
        for key in self.flat.keys()? {
            if key == self.keys.pre_migration_backup {
                continue;
            }
            if let Some(value) = self.flat.get_item(&key)? {
                items.insert(key, value);
            }
        }
        let snapshot = PreMigrationSnapshot {
            taken_at: now,
            items,
        };

        self.flat.set_item(
            &self.keys.pre_migration_backup,
            &serde_json::to_string(&snapshot)?,
        )?;
        // The flat copy is authoritative for restore; the structured copy is a fallback
        if let Err(e) = self
            .kv
            .set(&Collection::Backups, SNAPSHOT_BACKUP_KEY, &snapshot)
        {
            warn!("Could not mirror pre-migration snapshot: {}", e);
        }
        Ok(())
    }

    fn migrate_preferences(&self, key: &str) -> Result<usize> {
        let raw = self
            .flat
            .get_item(key)?
            .ok_or_else(|| ToolboxError::RecordNotFound(key.to_string()))?;
        let prefs = Preferences::from_json_str(&raw).ok_or_else(|| {
            ToolboxError::ValidationFailed("legacy preferences are not a JSON object".into())
        })?;
        self.kv
            .set(&Collection::Preferences, PREFERENCES_RECORD_KEY, &prefs)?;
        Ok(raw.len())
    }

    fn copy_legacy_item(&self, key: &str) -> Result<Option<usize>> {
        let Some(value) = self.flat.get_item(key)? else {
            return Ok(None);
        };
        let size = value.len();
        let item = LegacyItem {
            key: key.to_string(),
            value,
        };
        self.kv
            .set(&Collection::Backups, &legacy_backup_key(key), &item)?;
        Ok(Some(size))
    }

    /// Put every flat key back the way the snapshot recorded it.
    ///
    /// Namespaced keys not in the snapshot are removed. Returns the number of
    /// keys rewritten.
    pub fn restore_pre_migration_data(&self) -> Result<usize> {
        let snapshot = self.read_snapshot()?.ok_or_else(|| {
            ToolboxError::RecordNotFound("pre-migration snapshot".to_string())
        })?;

        for key in self.flat.keys()? {
            if self.keys.in_namespace(&key) && key != self.keys.pre_migration_backup {
                self.flat.remove_item(&key)?;
            }
        }
        for (key, value) in &snapshot.items {
            self.flat.set_item(key, value)?;
        }
        info!(
            "Restored {} flat keys from pre-migration snapshot",
            snapshot.items.len()
        );
        Ok(snapshot.items.len())
    }

    fn read_snapshot(&self) -> Result<Option<PreMigrationSnapshot>> {
        if let Some(raw) = self.flat.get_item(&self.keys.pre_migration_backup)? {
            match serde_json::from_str(&raw) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => warn!("Flat snapshot unreadable, trying backups: {}", e),
            }
        }
        self.kv.get(&Collection::Backups, SNAPSHOT_BACKUP_KEY)
    }
}
