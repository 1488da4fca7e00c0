//! SQLite-backed `StorageProbe`: sizes come
//! from pragmas and the `dbstat` virtual
//! table, counts from plain `COUNT(*)`.
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::domain::guardian::{CollectionStats, GuardianError, RawStorageStats};
use crate::ports::storage::StorageProbe;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct SqliteProbe {
    pool: SqlitePool,
}

impl SqliteProbe {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn pragma(&self, name: &str) -> Result<u64, GuardianError> {
        let value = sqlx::query_scalar::<_, i64>(&format!("PRAGMA {name}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GuardianError::Probe(format!("pragma {name}: {e}")))?;
        Ok(value.max(0) as u64)
    }

    /// Bytes per table or index name. Empty
    /// when the `dbstat` table is not
    /// compiled into this SQLite build.
    async fn object_sizes(&self) -> HashMap<String, u64> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT name, SUM(pgsize) FROM dbstat GROUP BY name",
        )
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(|(name, bytes)| (name, bytes.max(0) as u64))
                .collect(),
            Err(e) => {
                warn!(error = %e, "dbstat unavailable; per-table sizes reported as zero");
                HashMap::new()
            }
        }
    }
}

#[async_trait::async_trait]
impl StorageProbe for SqliteProbe {
    async fn storage_stats(&self) -> Result<RawStorageStats, GuardianError> {
        let page_size = self.pragma("page_size").await?;
        let page_count = self.pragma("page_count").await?;
        let freelist = self.pragma("freelist_count").await?;

        let tables = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GuardianError::Probe(format!("list tables: {e}")))?;

        let indexes = sqlx::query_as::<_, (String, String)>(
            "SELECT name, tbl_name FROM sqlite_master WHERE type = 'index'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GuardianError::Probe(format!("list indexes: {e}")))?;

        let sizes = self.object_sizes().await;

        let mut collections = BTreeMap::new();
        let mut total_index = 0u64;

        for table in tables {
            let count = sqlx::query_scalar::<_, i64>(&format!(
                "SELECT COUNT(*) FROM {}",
                quote_ident(&table)
            ))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GuardianError::Probe(format!("count {table}: {e}")))?;

            let own_indexes: Vec<&String> = indexes
                .iter()
                .filter(|(_, owner)| owner == &table)
                .map(|(name, _)| name)
                .collect();
            let index_size: u64 = own_indexes
                .iter()
                .map(|name| sizes.get(*name).copied().unwrap_or(0))
                .sum();
            let size = sizes.get(&table).copied().unwrap_or(0);

            total_index += index_size;
            collections.insert(
                table,
                CollectionStats::new(size, count.max(0) as u64, own_indexes.len() as u32, index_size),
            );
        }

        let storage_size = page_count * page_size;
        let data_size = page_count.saturating_sub(freelist) * page_size;

        debug!(data_size, storage_size, tables = collections.len(), "storage stats collected");

        Ok(RawStorageStats {
            data_size,
            storage_size,
            index_size: total_index,
            collections,
        })
    }

    async fn purge_inactive_announcements(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, GuardianError> {
        let result = sqlx::query(
            "DELETE FROM announcements WHERE is_active = 0 AND published_at < ?1",
        )
        .bind(cutoff.format(TIMESTAMP_FORMAT).to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| GuardianError::Probe(format!("purge announcements: {e}")))?;
        Ok(result.rows_affected())
    }

    async fn purge_attendance_before(&self, cutoff: DateTime<Utc>) -> Result<u64, GuardianError> {
        let result = sqlx::query("DELETE FROM attendance WHERE date < ?1")
            .bind(cutoff.format(DATE_FORMAT).to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| GuardianError::Probe(format!("purge attendance: {e}")))?;
        Ok(result.rows_affected())
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
