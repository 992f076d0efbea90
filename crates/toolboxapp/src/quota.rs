//! # Storage-Quota Reporter
//!
//! Reports usage for both backends in one shape:
//!
//! ```text
//! { structured: { usage, quota, percentage, quotaType, isOverQuota },
//!   flat:       { usage, quota, percentage } }
//! ```
//!
//! The structured figures come from the backend's estimate facility, with the
//! user's custom quota substituted as the denominator when enabled. The flat
//! store has no quota query, so its quota is a fixed estimate and its usage is
//! the summed byte length of every value under the application namespace.
//!
//! The warning decision ([`should_warn`]) is a pure function of the report, the
//! storage settings, and the current time, so the one-hour debounce can be
//! tested without waiting an hour.

use crate::error::Result;
use crate::model::FlatKeys;
use crate::prefs::model::StorageSettings;
use crate::store::backend::StorageEstimate;
use crate::store::flat::FlatStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaType {
    /// Backend-reported quota.
    Estimated,
    /// The user's override is in effect.
    Custom,
    /// No estimate facility.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaInfo {
    pub usage: u64,
    pub quota: u64,
    pub percentage: f64,
    pub quota_type: QuotaType,
    pub is_over_quota: bool,
}

impl QuotaInfo {
    pub fn unknown() -> Self {
        Self {
            usage: 0,
            quota: 0,
            percentage: 0.0,
            quota_type: QuotaType::Unknown,
            is_over_quota: false,
        }
    }

    pub fn resolve(
        estimate: Option<StorageEstimate>,
        custom_quota: Option<u64>,
        use_custom_quota: bool,
    ) -> Self {
        let Some(estimate) = estimate else {
            return Self::unknown();
        };

        let (quota, quota_type) = match custom_quota {
            Some(custom) if use_custom_quota && custom > 0 => (custom, QuotaType::Custom),
            _ => (estimate.quota, QuotaType::Estimated),
        };

        Self {
            usage: estimate.usage,
            quota,
            percentage: percentage(estimate.usage, quota),
            quota_type,
            is_over_quota: estimate.usage > quota,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatUsage {
    pub usage: u64,
    pub quota: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageReport {
    pub structured: QuotaInfo,
    pub flat: FlatUsage,
}

/// A quota warning that should be shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaWarning {
    pub percentage: f64,
    pub threshold: u8,
    pub usage: u64,
    pub quota: u64,
}

/// `usage / quota` as a percentage; 0 when quota is 0.
pub fn percentage(usage: u64, quota: u64) -> f64 {
    if quota == 0 {
        0.0
    } else {
        usage as f64 / quota as f64 * 100.0
    }
}

/// Summed byte length of every flat value under the namespace.
pub fn flat_usage<F: FlatStore>(flat: &F, keys: &FlatKeys, quota: u64) -> Result<FlatUsage> {
    let mut usage = 0u64;
    for key in flat.keys()? {
        if !keys.in_namespace(&key) {
            continue;
        }
        if let Some(value) = flat.get_item(&key)? {
            usage += value.len() as u64;
        }
    }
    Ok(FlatUsage {
        usage,
        quota,
        percentage: percentage(usage, quota),
    })
}

/// Whether a warning is due: usage at or over the threshold and the last
/// warning older than `interval_ms`.
pub fn should_warn(
    info: &QuotaInfo,
    storage: &StorageSettings,
    now_ms: i64,
    interval_ms: i64,
) -> Option<QuotaWarning> {
    if info.quota_type == QuotaType::Unknown {
        return None;
    }
    if info.percentage < f64::from(storage.warning_threshold) {
        return None;
    }
    if now_ms - storage.last_warning_time <= interval_ms {
        return None;
    }
    Some(QuotaWarning {
        percentage: info.percentage,
        threshold: storage.warning_threshold,
        usage: info.usage,
        quota: info.quota,
    })
}
