//! User preferences: the record, its transitions, and the manager that loads
//! and persists it.

pub mod action;
pub mod manager;
pub mod model;

pub use action::{reduce, Action};
pub use manager::{LoadSource, ManagerState, PreferenceManager, PreferencesObserver, QuotaCheck};
pub use model::{Density, DisplaySettings, Layout, Preferences, StorageSettings, UsageEntry};
