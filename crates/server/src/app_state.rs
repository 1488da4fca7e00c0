use std::sync::Arc;
use std::time::Duration;

use portal_core::app::guardian::Guardian;
use portal_core::infra::sqlite_probe::SqliteProbe;
use portal_core::infra::system_clock::SystemClock;
use sqlx::SqlitePool;

use crate::ai::{ChatProvider, OpenAiProvider};
use crate::cache::TtlCache;
use crate::config::{ConfigError, ServerConfig};
use crate::notify::Notifier;
use crate::prompts::assistant_prompt;
use crate::rate_limit::RateLimiter;

pub type PortalGuardian = Guardian<SqliteProbe, SystemClock>;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub app_name: String,
    pub token_ttl_seconds: u64,
    pub default_password: String,
    pub guardian: PortalGuardian,
    pub limiter: Arc<RateLimiter>,
    pub cache: Arc<TtlCache>,
    pub notifier: Arc<Notifier>,
    pub chat: Arc<dyn ChatProvider>,
    pub chat_timeout: Duration,
    pub system_prompt: Arc<str>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig, pool: SqlitePool) -> Result<Self, ConfigError> {
        let guardian = Guardian::new(
            config.guardian_policy(),
            Arc::new(SqliteProbe::new(pool.clone())),
            Arc::new(SystemClock),
        );

        let provider = OpenAiProvider::from_config(&config.ai)
            .map_err(|e| ConfigError::Invalid(format!("ai client: {e}")))?;
        if !provider.has_key() {
            tracing::warn!(
                env = %config.ai.api_key_env,
                "AI API key not set; chat requests will be rejected"
            );
        }

        Ok(Self {
            pool,
            app_name: config.app.name.clone(),
            token_ttl_seconds: config.auth.token_ttl_seconds,
            default_password: config.auth.default_password.clone(),
            guardian,
            limiter: Arc::new(RateLimiter::new(config.rate_limit.enabled)),
            cache: Arc::new(TtlCache::new(Duration::from_secs(
                config.cache.stats_ttl_seconds,
            ))),
            notifier: Arc::new(Notifier::new(config.portal_url(), config.app.name.clone())),
            chat: Arc::new(provider),
            chat_timeout: config.ai_timeout(),
            system_prompt: assistant_prompt(&config.app.name, &config.ai.admin_contact).into(),
        })
    }
}
