//! Storage backend the guardian observes
//! and prunes.
use chrono::{DateTime, Utc};

use crate::domain::guardian::{GuardianError, RawStorageStats};

#[async_trait::async_trait]
pub trait StorageProbe: Send + Sync {
    async fn storage_stats(&self) -> Result<RawStorageStats, GuardianError>;

    /// Deletes announcements that are both
    /// inactive and published before
    /// `cutoff`. Returns rows removed.
    async fn purge_inactive_announcements(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, GuardianError>;

    async fn purge_attendance_before(&self, cutoff: DateTime<Utc>) -> Result<u64, GuardianError>;
}
