//! # Academic Resources
//!
//! User-curated links kept in the ad hoc `customResources` collection.
//!
//! ## Schema Versions
//!
//! - v1: no `iconName`.
//! - v2: `iconName` present, defaulted from the category.
//!
//! Records are read as [`StoredResource`], which tolerates v1, and converted
//! with [`StoredResource::upgrade`]. The upgrade runs over the whole collection
//! at startup ([`ResourceManager::upgrade_all`]) and again on any read that
//! still meets a v1 record; upgraded records are written back.

use super::generate_id;
use crate::clock::Clock;
use crate::error::Result;
use crate::model::{Collection, Envelope};
use crate::store::backend::StructuredBackend;
use crate::store::kv::KvStore;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

pub const RESOURCE_SCHEMA_VERSION: u32 = 2;
pub const RESOURCE_ID_PREFIX: &str = "resource";
pub const RESOURCES_COLLECTION: &str = "customResources";

fn resources() -> Collection {
    Collection::Custom(RESOURCES_COLLECTION.to_string())
}

/// Icon shown for a category when the record carries none.
pub fn default_icon(category: &str) -> &'static str {
    match category.to_ascii_lowercase().as_str() {
        "database" => "database",
        "journal" => "book-open",
        "tool" => "wrench",
        "search" => "search",
        "course" => "graduation-cap",
        _ => "link",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AcademicResource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub icon_name: String,
    pub schema_version: u32,
    pub created_at: i64,
}

impl AcademicResource {
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

fn legacy_schema_version() -> u32 {
    1
}

/// A resource as found on disk, any schema version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub icon_name: Option<String>,
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub created_at: i64,
}

impl StoredResource {
    /// The current-schema record, and whether anything had to change.
    pub fn upgrade(self) -> (AcademicResource, bool) {
        let needs_icon = self.icon_name.as_deref().map_or(true, str::is_empty);
        let upgraded = needs_icon || self.schema_version < RESOURCE_SCHEMA_VERSION;
        let icon_name = match self.icon_name {
            Some(icon) if !icon.is_empty() => icon,
            _ => default_icon(&self.category).to_string(),
        };
        let resource = AcademicResource {
            id: self.id,
            name: self.name,
            url: self.url,
            description: self.description,
            category: self.category,
            tags: self.tags,
            icon_name,
            schema_version: RESOURCE_SCHEMA_VERSION,
            created_at: self.created_at,
        };
        (resource, upgraded)
    }
}

pub struct ResourceManager<B: StructuredBackend> {
    kv: Rc<KvStore<B>>,
    clock: Rc<dyn Clock>,
}

impl<B: StructuredBackend> ResourceManager<B> {
    pub fn new(kv: Rc<KvStore<B>>, clock: Rc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    pub fn save(&self, mut resource: AcademicResource) -> Result<String> {
        let now = self.clock.now_ms();
        if resource.id.is_empty() {
            resource.id = generate_id(RESOURCE_ID_PREFIX, now);
        }
        if resource.created_at == 0 {
            resource.created_at = now;
        }
        if resource.icon_name.is_empty() {
            resource.icon_name = default_icon(&resource.category).to_string();
        }
        resource.schema_version = RESOURCE_SCHEMA_VERSION;
        self.kv.set(&resources(), &resource.id, &resource)?;
        Ok(resource.id)
    }

    pub fn save_many(&self, resources: Vec<AcademicResource>) -> Result<Vec<String>> {
        resources.into_iter().map(|r| self.save(r)).collect()
    }

    pub fn get(&self, id: &str) -> Result<Option<AcademicResource>> {
        match self.kv.get_envelope(&resources(), id)? {
            Some(envelope) => Ok(self.read(envelope)),
            None => Ok(None),
        }
    }

    /// Every resource, newest first.
    pub fn get_all(&self) -> Result<Vec<AcademicResource>> {
        let mut all: Vec<AcademicResource> = self
            .kv
            .get_all(&resources())?
            .into_iter()
            .filter_map(|env| self.read(env))
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(all)
    }

    /// Bring every stored record to the current schema. Returns how many changed.
    pub fn upgrade_all(&self) -> Result<usize> {
        let mut upgraded = 0;
        for envelope in self.kv.get_all(&resources())? {
            let Some(stored) = parse_stored(envelope) else {
                continue;
            };
            let (resource, changed) = stored.upgrade();
            if changed && self.write_back(&resource) {
                upgraded += 1;
            }
        }
        if upgraded > 0 {
            info!("Upgraded {} resources to schema v{}", upgraded, RESOURCE_SCHEMA_VERSION);
        }
        Ok(upgraded)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.kv.delete(&resources(), id)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.kv.clear(&resources())
    }

    pub fn by_category(&self, category: &str) -> Result<Vec<AcademicResource>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|r| r.category.eq_ignore_ascii_case(category))
            .collect())
    }

    /// Case-insensitive match on name, description and tags; a blank query
    /// returns everything.
    pub fn search(&self, query: &str) -> Result<Vec<AcademicResource>> {
        let needle = query.trim().to_lowercase();
        let all = self.get_all()?;
        if needle.is_empty() {
            return Ok(all);
        }
        Ok(all.into_iter().filter(|r| r.matches(&needle)).collect())
    }

    fn read(&self, envelope: Envelope<Value>) -> Option<AcademicResource> {
        let (resource, changed) = parse_stored(envelope)?.upgrade();
        if changed {
            self.write_back(&resource);
        }
        Some(resource)
    }

    fn write_back(&self, resource: &AcademicResource) -> bool {
        match self.kv.set(&resources(), &resource.id, resource) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not re-save upgraded resource '{}': {}", resource.id, e);
                false
            }
        }
    }
}

fn parse_stored(envelope: Envelope<Value>) -> Option<StoredResource> {
    match serde_json::from_value::<StoredResource>(envelope.data) {
        Ok(mut stored) => {
            if stored.id.is_empty() {
                stored.id = envelope.id;
            }
            Some(stored)
        }
        Err(e) => {
            warn!("Skipping unreadable resource '{}': {}", envelope.id, e);
            None
        }
    }
}
