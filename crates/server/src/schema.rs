use std::path::Path;

use sqlx::SqlitePool;
use tokio::fs;

use crate::config::ConfigError;

/// Schema bundled into the binary, for callers without a config directory.
pub const BUNDLED_SCHEMA: &str = include_str!("../res/sql/sqlite/schema.sql");

pub async fn apply_server_schema(pool: &SqlitePool, config_path: &Path) -> Result<(), ConfigError> {
    let base_dir = config_path
        .parent()
        .ok_or_else(|| ConfigError::Invalid("config path has no parent".into()))?;
    let schema_path = base_dir.join("sql").join("sqlite").join("schema.sql");
    let content = fs::read_to_string(&schema_path).await.map_err(|_| {
        ConfigError::Invalid(format!("schema not found at {}", schema_path.display()))
    })?;
    execute_schema(pool, &content).await
}

/// Runs each `;`-separated statement in order.
pub async fn execute_schema(pool: &SqlitePool, content: &str) -> Result<(), ConfigError> {
    for stmt in content.split(';') {
        let trimmed = stmt.trim();
        if trimmed.is_empty() {
            continue;
        }
        sqlx::query(trimmed)
            .execute(pool)
            .await
            .map_err(|e| ConfigError::Invalid(format!("schema apply error: {e}")))?;
    }
    Ok(())
}
