//! Storage guardian domain: policy
//! constants, stats snapshots, and the
//! pure classification rules applied to
//! them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum GuardianError {
    #[error("storage probe failed: {0}")]
    Probe(String),
}

/// Thresholds the guardian classifies
/// against. All static; nothing here is
/// derived from observed growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianPolicy {
    pub storage_limit_bytes: u64,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub bloat_avg_obj_bytes: u64,
    pub index_to_data_ratio: f64,
    pub announcement_retention_months: u32,
    pub attendance_retention_months: u32,
    pub interval_seconds: u64,
}

impl Default for GuardianPolicy {
    fn default() -> Self {
        Self {
            storage_limit_bytes: 512 * MIB,
            warning_threshold: 0.70,
            critical_threshold: 0.85,
            bloat_avg_obj_bytes: 50_000,
            index_to_data_ratio: 0.5,
            announcement_retention_months: 6,
            attendance_retention_months: 24,
            interval_seconds: 6 * 60 * 60,
        }
    }
}

/// Raw numbers reported by a storage
/// backend, before any policy is applied.
#[derive(Debug, Clone, Default)]
pub struct RawStorageStats {
    pub data_size: u64,
    pub storage_size: u64,
    pub index_size: u64,
    pub collections: BTreeMap<String, CollectionStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub size: u64,
    pub count: u64,
    pub avg_obj_size: u64,
    pub storage_size: u64,
    pub indexes: u32,
    pub index_size: u64,
}

impl CollectionStats {
    pub fn new(size: u64, count: u64, indexes: u32, index_size: u64) -> Self {
        let avg_obj_size = if count == 0 { 0 } else { size / count };
        Self {
            size,
            count,
            avg_obj_size,
            storage_size: size,
            indexes,
            index_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub total_size: u64,
    pub storage_size: u64,
    pub index_size: u64,
    pub collections: BTreeMap<String, CollectionStats>,
    pub usage_percent: f64,
}

impl DatabaseStats {
    pub fn from_raw(raw: RawStorageStats, policy: &GuardianPolicy) -> Self {
        let usage_percent = usage_percent(raw.data_size, policy.storage_limit_bytes);
        Self {
            total_size: raw.data_size,
            storage_size: raw.storage_size,
            index_size: raw.index_size,
            collections: raw.collections,
            usage_percent,
        }
    }
}

pub fn usage_percent(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 100.0;
    }
    used as f64 / limit as f64 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloatIssue {
    #[serde(rename = "Large average document size")]
    LargeAverageDocument,
    #[serde(rename = "Index size exceeds 50% of data size")]
    OversizedIndexes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloatFinding {
    pub collection: String,
    pub issue: BloatIssue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_size: Option<u64>,
    pub recommendation: String,
}

/// Flags tables whose rows are unusually
/// large or whose indexes outweigh half
/// of their data.
pub fn detect_bloat(stats: &DatabaseStats, policy: &GuardianPolicy) -> Vec<BloatFinding> {
    let mut findings = Vec::new();

    for (name, data) in &stats.collections {
        if data.avg_obj_size > policy.bloat_avg_obj_bytes {
            findings.push(BloatFinding {
                collection: name.clone(),
                issue: BloatIssue::LargeAverageDocument,
                avg_size: Some(data.avg_obj_size),
                index_size: None,
                recommendation: "Check for base64 files or large text fields".to_string(),
            });
        }

        if data.index_size as f64 > data.size as f64 * policy.index_to_data_ratio {
            findings.push(BloatFinding {
                collection: name.clone(),
                issue: BloatIssue::OversizedIndexes,
                avg_size: None,
                index_size: Some(data.index_size),
                recommendation: "Review and remove unused indexes".to_string(),
            });
        }
    }

    findings
}

pub fn classify_usage(usage_percent: f64, policy: &GuardianPolicy) -> HealthStatus {
    if usage_percent > policy.critical_threshold * 100.0 {
        HealthStatus::Critical
    } else if usage_percent > policy.warning_threshold * 100.0 {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhaustionPrediction {
    pub current_usage: String,
    pub remaining_space: String,
    pub usage_percent: f64,
    pub remaining_bytes: i64,
    pub status: HealthStatus,
    pub recommendations: Vec<String>,
}

pub fn predict_exhaustion(stats: &DatabaseStats, policy: &GuardianPolicy) -> ExhaustionPrediction {
    let status = classify_usage(stats.usage_percent, policy);
    let remaining_bytes = policy.storage_limit_bytes as i64 - stats.total_size as i64;

    let recommendations = match status {
        HealthStatus::Critical => vec![
            "IMMEDIATE ACTION: Activate survival mode".to_string(),
            "Archive or delete old data".to_string(),
            "Move files to external storage".to_string(),
        ],
        HealthStatus::Warning => vec![
            "Schedule data cleanup".to_string(),
            "Review large collections".to_string(),
        ],
        HealthStatus::Healthy => Vec::new(),
    };

    ExhaustionPrediction {
        current_usage: format!("{:.2}%", stats.usage_percent),
        remaining_space: format!("{:.2} MB", remaining_bytes as f64 / MIB as f64),
        usage_percent: stats.usage_percent,
        remaining_bytes,
        status,
        recommendations,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub announcements_archived: u64,
    pub attendance_archived: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalAction {
    pub action: String,
    pub result: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalReport {
    pub mode: String,
    pub timestamp: DateTime<Utc>,
    pub actions: Vec<SurvivalAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub database: Option<DatabaseStats>,
    pub bloat: Vec<BloatFinding>,
    pub prediction: Option<ExhaustionPrediction>,
    pub cleanup: Option<SurvivalReport>,
    pub survival_mode: bool,
}

/// What the guardian remembers between
/// checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianSnapshot {
    pub last_check: Option<DateTime<Utc>>,
    pub db_size: u64,
    pub last_status: Option<HealthStatus>,
    pub alerts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_with(usage_bytes: u64) -> DatabaseStats {
        let policy = GuardianPolicy::default();
        DatabaseStats::from_raw(
            RawStorageStats {
                data_size: usage_bytes,
                storage_size: usage_bytes,
                index_size: 0,
                collections: BTreeMap::new(),
            },
            &policy,
        )
    }

    #[test]
    fn thresholds_are_strict() {
        let policy = GuardianPolicy::default();
        assert_eq!(classify_usage(70.0, &policy), HealthStatus::Healthy);
        assert_eq!(classify_usage(70.01, &policy), HealthStatus::Warning);
        assert_eq!(classify_usage(85.0, &policy), HealthStatus::Warning);
        assert_eq!(classify_usage(85.01, &policy), HealthStatus::Critical);
    }

    #[test]
    fn prediction_formats_usage_and_remaining() {
        let policy = GuardianPolicy::default();
        let p = predict_exhaustion(&stats_with(256 * MIB), &policy);
        assert_eq!(p.current_usage, "50.00%");
        assert_eq!(p.remaining_space, "256.00 MB");
        assert!(p.recommendations.is_empty());
    }

    #[test]
    fn avg_size_is_zero_for_empty_collections() {
        let c = CollectionStats::new(4096, 0, 1, 4096);
        assert_eq!(c.avg_obj_size, 0);
    }
}
