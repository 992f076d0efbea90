//! # Configuration
//!
//! Toolbox configuration is a [`confique`] struct, loaded in priority order:
//!
//! 1. **Environment variables**: `TOOLBOX_` followed by the upper-cased key.
//! 2. **Data-dir file**: `<data>/toolbox.toml`.
//! 3. **Compiled defaults**: `#[config(default = ...)]` below.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `namespace` | `toolbox-` | Prefix of every flat key the core owns |
//! | `flat_quota_bytes` | `5242880` | Assumed capacity of the flat-key store |
//! | `structured_quota_bytes` | `10737418240` | Capacity reported by the filesystem backend |
//! | `migration_retry` | `mark-complete` | Whether a partially failed migration is retried |
//! | `early_calls` | `queue` | What happens to actions dispatched before load completes |
//! | `warning_interval_secs` | `3600` | Minimum gap between two quota warnings |

use confique::Config;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "toolbox-";
pub const DEFAULT_FLAT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_STRUCTURED_QUOTA_BYTES: u64 = 10 * 1024 * 1024 * 1024;
pub const DEFAULT_WARNING_INTERVAL_SECS: u64 = 3600;

/// What the migration marker records when some items failed to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPolicy {
    /// Write `completed = true` regardless; failed items are not retried.
    #[default]
    MarkComplete,
    /// Write `completed = false` so the next startup migrates again.
    RetryOnFailure,
}

/// Handling of preference actions dispatched before the manager is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EarlyCallPolicy {
    /// Apply to in-memory defaults now, replay onto the loaded record later.
    #[default]
    Queue,
    /// Fail with `NotReady`.
    Reject,
}

/// Configuration for toolbox, stored in `toolbox.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolboxConfig {
    #[config(default = "toolbox-", env = "TOOLBOX_NAMESPACE")]
    pub namespace: String,

    #[config(default = 5242880, env = "TOOLBOX_FLAT_QUOTA_BYTES")]
    pub flat_quota_bytes: u64,

    #[config(default = 10737418240u64, env = "TOOLBOX_STRUCTURED_QUOTA_BYTES")]
    pub structured_quota_bytes: u64,

    #[config(default = "mark-complete", env = "TOOLBOX_MIGRATION_RETRY")]
    pub migration_retry: RetryPolicy,

    #[config(default = "queue", env = "TOOLBOX_EARLY_CALLS")]
    pub early_calls: EarlyCallPolicy,

    #[config(default = 3600, env = "TOOLBOX_WARNING_INTERVAL_SECS")]
    pub warning_interval_secs: u64,
}

impl Default for ToolboxConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            flat_quota_bytes: DEFAULT_FLAT_QUOTA_BYTES,
            structured_quota_bytes: DEFAULT_STRUCTURED_QUOTA_BYTES,
            migration_retry: RetryPolicy::MarkComplete,
            early_calls: EarlyCallPolicy::Queue,
            warning_interval_secs: DEFAULT_WARNING_INTERVAL_SECS,
        }
    }
}

impl ToolboxConfig {
    /// Quota warning debounce in milliseconds.
    pub fn warning_interval_ms(&self) -> i64 {
        i64::try_from(self.warning_interval_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ToolboxConfig::default();
        assert_eq!(config.namespace, "toolbox-");
        assert_eq!(config.flat_quota_bytes, 5 * 1024 * 1024);
        assert_eq!(config.migration_retry, RetryPolicy::MarkComplete);
        assert_eq!(config.early_calls, EarlyCallPolicy::Queue);
        assert_eq!(config.warning_interval_ms(), 3_600_000);
    }

    #[test]
    fn test_builder_defaults_match_default_impl() {
        let config = ToolboxConfig::builder().load().unwrap();
        assert_eq!(config, ToolboxConfig::default());
    }

    #[test]
    fn test_policies_use_kebab_and_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&RetryPolicy::RetryOnFailure).unwrap(),
            "\"retry-on-failure\""
        );
        assert_eq!(
            serde_json::from_str::<EarlyCallPolicy>("\"reject\"").unwrap(),
            EarlyCallPolicy::Reject
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolbox.toml");
        std::fs::write(
            &path,
            "namespace = \"tb-\"\nmigration_retry = \"retry-on-failure\"\n",
        )
        .unwrap();
        let config = ToolboxConfig::builder().file(&path).load().unwrap();
        assert_eq!(config.namespace, "tb-");
        assert_eq!(config.migration_retry, RetryPolicy::RetryOnFailure);
        assert_eq!(config.early_calls, EarlyCallPolicy::Queue);
    }
}
