//! # Preferences Record
//!
//! One record per installation, persisted as camelCase JSON so that legacy
//! blobs (`{"favoriteTools": ["x"]}`) parse unchanged.
//!
//! ## Invariants
//!
//! - `favorite_tools` has no duplicates.
//! - `usage_history` holds at most one entry per tool, sorted by `last_used`
//!   descending, never longer than `settings.max_history_items`.
//! - `search_history` is duplicate free, most recent first, never longer than
//!   `settings.max_search_history`.
//! - `storage.warning_threshold` is within 0..=100.
//!
//! [`Preferences::normalized`] re-establishes all of them and runs on every
//! record that enters the system from outside (load, import, migration).
//!
//! ## Shallow Merge
//!
//! Legacy blobs and imports may be partial or from an older shape.
//! [`Preferences::merge_json`] overlays each recognised top-level field of a
//! JSON object onto a base record. A field that fails to parse is skipped with
//! a warning rather than failing the whole record; nested objects are parsed
//! with their own defaults for missing members.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_MAX_HISTORY_ITEMS: usize = 10;
pub const DEFAULT_MAX_SEARCH_HISTORY: usize = 20;
pub const DEFAULT_CUSTOM_QUOTA: u64 = 5 * 1024 * 1024 * 1024;
pub const DEFAULT_WARNING_THRESHOLD: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Compact,
    #[default]
    Standard,
    Spacious,
}

impl std::str::FromStr for Density {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Density::Compact),
            "standard" => Ok(Density::Standard),
            "spacious" => Ok(Density::Spacious),
            other => Err(format!("unknown density '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    pub tool_id: String,
    pub last_used: i64,
    pub usage_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    pub show_favorites: bool,
    pub show_recent_tools: bool,
    pub show_search_history: bool,
    pub show_news_sidebar: bool,
    pub max_history_items: usize,
    pub max_search_history: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_favorites: true,
            show_recent_tools: true,
            show_search_history: true,
            show_news_sidebar: true,
            max_history_items: DEFAULT_MAX_HISTORY_ITEMS,
            max_search_history: DEFAULT_MAX_SEARCH_HISTORY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Layout {
    pub density: Density,
    pub grid_columns: u8,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            density: Density::Standard,
            grid_columns: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Quota override in bytes.
    pub custom_quota: u64,
    pub use_custom_quota: bool,
    /// Percentage (0..=100) at which the quota warning fires.
    pub warning_threshold: u8,
    /// Epoch ms of the last quota warning shown; drives the debounce.
    pub last_warning_time: i64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            custom_quota: DEFAULT_CUSTOM_QUOTA,
            use_custom_quota: true,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            last_warning_time: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub favorite_tools: Vec<String>,
    pub usage_history: Vec<UsageEntry>,
    pub search_history: Vec<String>,
    pub settings: DisplaySettings,
    pub layout: Layout,
    pub storage: StorageSettings,
}

impl Preferences {
    pub fn is_favorite(&self, tool_id: &str) -> bool {
        self.favorite_tools.iter().any(|t| t == tool_id)
    }

    pub fn usage_of(&self, tool_id: &str) -> Option<&UsageEntry> {
        self.usage_history.iter().find(|u| u.tool_id == tool_id)
    }

    /// Parse a stored or imported blob; it must be a JSON object.
    pub fn from_json_str(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self::merge_json(Self::default(), object))
    }

    /// Shallow-merge the recognised top-level fields of `object` onto `base`.
    pub fn merge_json(base: Self, object: &Map<String, Value>) -> Self {
        let mut prefs = base;
        merge_field(object, "favoriteTools", &mut prefs.favorite_tools);
        merge_field(object, "usageHistory", &mut prefs.usage_history);
        merge_field(object, "searchHistory", &mut prefs.search_history);
        merge_field(object, "settings", &mut prefs.settings);
        merge_field(object, "layout", &mut prefs.layout);
        merge_field(object, "storage", &mut prefs.storage);
        prefs.normalized()
    }

    /// Re-establish every invariant of the record.
    pub fn normalized(mut self) -> Self {
        dedup_preserving_order(&mut self.favorite_tools);

        self.search_history.retain(|t| !t.trim().is_empty());
        dedup_preserving_order(&mut self.search_history);
        self.search_history
            .truncate(self.settings.max_search_history);

        self.usage_history
            .sort_by(|a, b| b.last_used.cmp(&a.last_used));
        let mut seen = Vec::new();
        self.usage_history.retain(|entry| {
            if seen.contains(&entry.tool_id) {
                false
            } else {
                seen.push(entry.tool_id.clone());
                true
            }
        });
        self.usage_history
            .truncate(self.settings.max_history_items);

        self.storage.warning_threshold = self.storage.warning_threshold.min(100);
        self
    }
}

fn merge_field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str, target: &mut T) {
    if let Some(value) = object.get(key) {
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => *target = parsed,
            Err(e) => warn!("Ignoring malformed preferences field '{}': {}", key, e),
        }
    }
}

fn dedup_preserving_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Partial update for [`DisplaySettings`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub show_favorites: Option<bool>,
    pub show_recent_tools: Option<bool>,
    pub show_search_history: Option<bool>,
    pub show_news_sidebar: Option<bool>,
    pub max_history_items: Option<usize>,
    pub max_search_history: Option<usize>,
}

impl SettingsPatch {
    pub fn apply(&self, settings: &mut DisplaySettings) {
        if let Some(v) = self.show_favorites {
            settings.show_favorites = v;
        }
        if let Some(v) = self.show_recent_tools {
            settings.show_recent_tools = v;
        }
        if let Some(v) = self.show_search_history {
            settings.show_search_history = v;
        }
        if let Some(v) = self.show_news_sidebar {
            settings.show_news_sidebar = v;
        }
        if let Some(v) = self.max_history_items {
            settings.max_history_items = v;
        }
        if let Some(v) = self.max_search_history {
            settings.max_search_history = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutPatch {
    pub density: Option<Density>,
    pub grid_columns: Option<u8>,
}

impl LayoutPatch {
    pub fn apply(&self, layout: &mut Layout) {
        if let Some(density) = self.density {
            layout.density = density;
        }
        if let Some(columns) = self.grid_columns {
            layout.grid_columns = columns;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoragePatch {
    pub custom_quota: Option<u64>,
    pub use_custom_quota: Option<bool>,
    pub warning_threshold: Option<u8>,
    pub last_warning_time: Option<i64>,
}

impl StoragePatch {
    pub fn apply(&self, storage: &mut StorageSettings) {
        if let Some(v) = self.custom_quota {
            storage.custom_quota = v;
        }
        if let Some(v) = self.use_custom_quota {
            storage.use_custom_quota = v;
        }
        if let Some(v) = self.warning_threshold {
            storage.warning_threshold = v.min(100);
        }
        if let Some(v) = self.last_warning_time {
            storage.last_warning_time = v;
        }
    }
}
