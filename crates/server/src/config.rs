use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use portal_core::domain::guardian::{
  GuardianPolicy,
  MIB
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]

pub enum ConfigError {
  #[error("config IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("config parse error: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("config invalid: {0}")]
  Invalid(String)
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]

pub enum AppMode {
  Dev,
  Prod
}

#[derive(Debug, Clone, Deserialize)]

pub struct ServerConfig {
  pub app:        AppConfig,
  pub http:       HttpConfig,
  pub sqlite:     SqliteConfig,
  pub logging:    LoggingConfig,
  pub auth:       AuthConfig,
  pub dev:        DevConfig,
  pub seed:       SeedConfig,
  pub guardian:   GuardianConfig,
  pub rate_limit: RateLimitConfig,
  pub ai:         AiConfig,
  pub cache:      CacheConfig
}

#[derive(Debug, Clone, Deserialize)]

pub struct AppConfig {
  pub mode:       AppMode,
  pub name:       String,
  pub timezone:   Option<String>,
  /// Base URL of the web frontend,
  /// used in notification links.
  pub portal_url: Option<String>
}

#[derive(Debug, Clone, Deserialize)]

pub struct HttpConfig {
  pub host: String,
  pub port: u16
}

#[derive(Debug, Clone, Deserialize)]

pub struct SqliteConfig {
  pub path:            String,
  pub max_connections: Option<u32>
}

#[derive(Debug, Clone, Deserialize)]

pub struct LoggingConfig {
  pub level: Option<String>
}

#[derive(Debug, Clone, Deserialize)]

pub struct AuthConfig {
  pub token_ttl_seconds: u64,
  /// Used by bulk registration when a
  /// row carries no password.
  pub default_password:  String
}

#[derive(Debug, Clone, Deserialize)]

pub struct DevConfig {
  pub reset_on_start: bool
}

#[derive(Debug, Clone, Deserialize)]

pub struct SeedConfig {
  pub admin_name:     String,
  pub admin_email:    String,
  pub admin_password: String
}

#[derive(Debug, Clone, Deserialize)]

pub struct GuardianConfig {
  pub enabled: bool,
  pub storage_limit_mb: Option<u64>,
  pub warning_threshold: Option<f64>,
  pub critical_threshold: Option<f64>,
  pub interval_seconds: Option<u64>,
  pub announcement_retention_months:
    Option<u32>,
  pub attendance_retention_months:
    Option<u32>
}

#[derive(Debug, Clone, Deserialize)]

pub struct RateLimitConfig {
  pub enabled: bool
}

#[derive(Debug, Clone, Deserialize)]

pub struct AiConfig {
  pub base_url:        String,
  pub model:           String,
  pub api_key_env:     String,
  pub max_tokens:      u32,
  pub timeout_seconds: u64,
  pub admin_contact:   String
}

#[derive(Debug, Clone, Deserialize)]

pub struct CacheConfig {
  pub stats_ttl_seconds: u64
}

impl ServerConfig {
  pub async fn load(
    path: &Path
  ) -> Result<Self, ConfigError> {
    let base_dir = path
      .parent()
      .ok_or_else(|| {
        ConfigError::Invalid(
          "config path has no parent"
            .into()
        )
      })?;

    let schema_path = base_dir
      .join("schemas")
      .join("server.schema.json");

    let schema =
      load_schema(&schema_path).await?;

    let content =
      tokio::fs::read_to_string(path)
        .await?;

    validate_toml(
      &schema,
      &content,
      &path.display().to_string()
    )?;

    let config: ServerConfig =
      toml::from_str(&content)?;

    config.validate()?;

    Ok(config)
  }

  fn validate(
    &self
  ) -> Result<(), ConfigError> {
    let g = &self.guardian;

    let warning = g
      .warning_threshold
      .unwrap_or(0.70);
    let critical = g
      .critical_threshold
      .unwrap_or(0.85);

    if warning >= critical {
      return Err(ConfigError::Invalid(
        format!(
          "guardian.warning_threshold \
           ({warning}) must be below \
           critical_threshold \
           ({critical})"
        )
      ));
    }

    if self
      .auth
      .default_password
      .trim()
      .len()
      < 6
    {
      return Err(ConfigError::Invalid(
        "auth.default_password must \
         be at least 6 characters"
          .into()
      ));
    }

    Ok(())
  }

  pub fn sqlite_path(
    &self,
    base_dir: &Path
  ) -> PathBuf {
    let raw = self.sqlite.path.trim();

    if raw.is_empty() {
      return base_dir
        .join("portal.sqlite");
    }

    base_dir.join(raw)
  }

  pub fn guardian_policy(
    &self
  ) -> GuardianPolicy {
    let defaults =
      GuardianPolicy::default();
    let g = &self.guardian;

    GuardianPolicy {
      storage_limit_bytes: g
        .storage_limit_mb
        .map(|mb| mb * MIB)
        .unwrap_or(
          defaults.storage_limit_bytes
        ),
      warning_threshold: g
        .warning_threshold
        .unwrap_or(
          defaults.warning_threshold
        ),
      critical_threshold: g
        .critical_threshold
        .unwrap_or(
          defaults.critical_threshold
        ),
      interval_seconds: g
        .interval_seconds
        .unwrap_or(
          defaults.interval_seconds
        ),
      announcement_retention_months: g
        .announcement_retention_months
        .unwrap_or(
          defaults
            .announcement_retention_months
        ),
      attendance_retention_months: g
        .attendance_retention_months
        .unwrap_or(
          defaults
            .attendance_retention_months
        ),
      ..defaults
    }
  }

  pub fn ai_timeout(&self) -> Duration {
    Duration::from_secs(
      self.ai.timeout_seconds.max(1)
    )
  }

  pub fn portal_url(&self) -> String {
    self
      .app
      .portal_url
      .clone()
      .unwrap_or_else(|| {
        "http://localhost:3000"
          .to_string()
      })
  }
}

async fn load_schema(
  path: &Path
) -> Result<String, ConfigError> {
  let content =
    tokio::fs::read_to_string(path)
      .await
      .map_err(|_| {
        ConfigError::Invalid(format!(
          "schema not found at {}",
          path.display()
        ))
      })?;

  Ok(content)
}

fn validate_toml(
  schema: &str,
  toml_input: &str,
  name: &str
) -> Result<(), ConfigError> {
  let schema_json: serde_json::Value =
    serde_json::from_str(schema)
      .map_err(|e| {
        ConfigError::Invalid(format!(
          "schema parse error: {e}"
        ))
      })?;

  let compiled =
    jsonschema::validator_for(
      &schema_json
    )
    .map_err(|e| {
      ConfigError::Invalid(format!(
        "schema compile error: {e}"
      ))
    })?;

  let toml_value: toml::Value =
    toml::from_str(toml_input)
      .map_err(|e| {
        ConfigError::Invalid(format!(
          "{name}: {e}"
        ))
      })?;

  let json_value =
    serde_json::to_value(toml_value)
      .map_err(|e| {
        ConfigError::Invalid(
          e.to_string()
        )
      })?;

  let mut errors =
    compiled.iter_errors(&json_value);

  if let Some(err) = errors.next() {
    let mut messages =
      vec![err.to_string()];

    for e in errors.take(4) {
      messages.push(e.to_string());
    }

    return Err(ConfigError::Invalid(
      format!(
        "schema validation failed for \
         {name}: {}",
        messages.join("; ")
      )
    ));
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const SCHEMA: &str = include_str!(
    "../res/schemas/server.schema.json"
  );
  const CONFIG: &str =
    include_str!("../res/config.toml");

  #[test]
  fn bundled_config_passes_schema() {
    validate_toml(SCHEMA, CONFIG, "config.toml")
      .unwrap();
    let cfg: ServerConfig =
      toml::from_str(CONFIG).unwrap();
    cfg.validate().unwrap();
    assert_eq!(
      cfg.guardian_policy().storage_limit_bytes,
      512 * MIB
    );
  }

  #[test]
  fn unknown_section_is_rejected() {
    let bad = format!(
      "{CONFIG}\n[surprise]\nkey = 1\n"
    );
    let err = validate_toml(
      SCHEMA, &bad, "bad.toml"
    )
    .unwrap_err();
    assert!(
      err.to_string().contains("bad.toml")
    );
  }
}
