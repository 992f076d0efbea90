//! # Transitions
//!
//! The preferences record only changes through [`Action`]s applied by
//! [`reduce`], a pure function: same record, action, and time in, same record
//! out. Persistence is not done here; the manager notifies observers after each
//! transition.

use super::model::{LayoutPatch, Preferences, SettingsPatch, StoragePatch, UsageEntry};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddFavorite(String),
    RemoveFavorite(String),
    RecordUsage(String),
    AddSearchHistory(String),
    ClearSearchHistory,
    UpdateSettings(SettingsPatch),
    UpdateLayout(LayoutPatch),
    UpdateStorage(StoragePatch),
    ClearAll,
    /// Swap in a whole record (import).
    Replace(Box<Preferences>),
}

impl Action {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddFavorite(_) => "add-favorite",
            Action::RemoveFavorite(_) => "remove-favorite",
            Action::RecordUsage(_) => "record-usage",
            Action::AddSearchHistory(_) => "add-search-history",
            Action::ClearSearchHistory => "clear-search-history",
            Action::UpdateSettings(_) => "update-settings",
            Action::UpdateLayout(_) => "update-layout",
            Action::UpdateStorage(_) => "update-storage",
            Action::ClearAll => "clear-all",
            Action::Replace(_) => "replace",
        }
    }
}

pub fn reduce(prefs: &Preferences, action: &Action, now_ms: i64) -> Preferences {
    let mut next = prefs.clone();
    match action {
        Action::AddFavorite(id) => {
            if !next.is_favorite(id) {
                next.favorite_tools.push(id.clone());
            }
        }
        Action::RemoveFavorite(id) => {
            next.favorite_tools.retain(|t| t != id);
        }
        Action::RecordUsage(id) => {
            match next.usage_history.iter_mut().find(|u| &u.tool_id == id) {
                Some(entry) => {
                    entry.usage_count += 1;
                    entry.last_used = now_ms;
                }
                None => next.usage_history.push(UsageEntry {
                    tool_id: id.clone(),
                    last_used: now_ms,
                    usage_count: 1,
                }),
            }
            // Stable sort: equal timestamps keep their relative order
            next.usage_history
                .sort_by(|a, b| b.last_used.cmp(&a.last_used));
            next.usage_history
                .truncate(next.settings.max_history_items);
        }
        Action::AddSearchHistory(term) => {
            let term = term.trim();
            if !term.is_empty() && !next.search_history.iter().any(|t| t == term) {
                next.search_history.insert(0, term.to_string());
                next.search_history
                    .truncate(next.settings.max_search_history);
            }
        }
        Action::ClearSearchHistory => next.search_history.clear(),
        Action::UpdateSettings(patch) => {
            patch.apply(&mut next.settings);
            next.usage_history
                .truncate(next.settings.max_history_items);
            next.search_history
                .truncate(next.settings.max_search_history);
        }
        Action::UpdateLayout(patch) => patch.apply(&mut next.layout),
        Action::UpdateStorage(patch) => patch.apply(&mut next.storage),
        Action::ClearAll => next = Preferences::default(),
        Action::Replace(prefs) => next = prefs.as_ref().clone().normalized(),
    }
    next
}
