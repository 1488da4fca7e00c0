#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use portal_core::app::guardian::Guardian;
use portal_core::domain::guardian::GuardianPolicy;
use portal_core::infra::sqlite_pool::memory_pool;
use portal_core::infra::sqlite_probe::SqliteProbe;
use portal_core::infra::system_clock::SystemClock;
use portal_server::ai::{ChatError, ChatMessage, ChatProvider};
use portal_server::app_state::AppState;
use portal_server::auth::{generate_token, hash_token};
use portal_server::cache::TtlCache;
use portal_server::db::{insert_user, NewUser};
use portal_server::models::users::Role;
use portal_server::notify::Notifier;
use portal_server::rate_limit::RateLimiter;
use portal_server::schema::{execute_schema, BUNDLED_SCHEMA};
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;

/// Scripted chat provider.
pub enum FakeChat {
    Reply(String),
    /// Replies with the portal-context system message.
    EchoContext,
    Sleep(Duration),
    RateLimited,
    Broken,
}

#[async_trait::async_trait]
impl ChatProvider for FakeChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        match self {
            FakeChat::Reply(text) => Ok(format!("{text} ({} messages)", messages.len())),
            FakeChat::EchoContext => Ok(messages
                .iter()
                .find(|m| m.content.starts_with("Context from portal data"))
                .map(|m| m.content.clone())
                .unwrap_or_default()),
            FakeChat::Sleep(d) => {
                tokio::time::sleep(*d).await;
                Ok("too late".to_string())
            }
            FakeChat::RateLimited => Err(ChatError::RateLimited),
            FakeChat::Broken => Err(ChatError::Upstream {
                status: 500,
                body: "boom".to_string(),
            }),
        }
    }
}

pub async fn test_pool() -> SqlitePool {
    let pool = memory_pool().await.unwrap();
    execute_schema(&pool, BUNDLED_SCHEMA).await.unwrap();
    pool
}

pub async fn test_state() -> AppState {
    state_with_chat(FakeChat::Reply("ok".to_string()), Duration::from_secs(5)).await
}

pub async fn state_with_chat(chat: FakeChat, chat_timeout: Duration) -> AppState {
    let pool = test_pool().await;
    AppState {
        pool: pool.clone(),
        app_name: "Test Campus".to_string(),
        token_ttl_seconds: 3600,
        default_password: "welcome123".to_string(),
        guardian: Guardian::new(
            GuardianPolicy::default(),
            Arc::new(SqliteProbe::new(pool)),
            Arc::new(SystemClock),
        ),
        limiter: Arc::new(RateLimiter::new(false)),
        cache: Arc::new(TtlCache::new(Duration::from_secs(60))),
        notifier: Arc::new(Notifier::new("http://portal.test", "Test Campus")),
        chat: Arc::new(chat),
        chat_timeout,
        system_prompt: "You are the test assistant.".into(),
    }
}

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestUser {
    pub fn headers(&self) -> HeaderMap {
        bearer(&self.token)
    }
}

pub fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {token}")).unwrap();
    headers.insert(axum::http::header::AUTHORIZATION, value);
    headers
}

/// Inserts a user with an unusable password hash and issues a live token.
pub async fn user_with(
    state: &AppState,
    email: &str,
    role: Role,
    customize: impl FnOnce(&mut NewUser),
) -> TestUser {
    let mut user = NewUser::new(email, email, "not-a-hash".to_string(), role);
    customize(&mut user);
    let id = insert_user(&state.pool, &user).await.unwrap();

    let token = generate_token();
    sqlx::query(
        "INSERT INTO user_tokens (user_id, token_hash, expires_at) \
         VALUES (?1, ?2, datetime('now', '+1 hour'))",
    )
    .bind(id)
    .bind(hash_token(&token))
    .execute(&state.pool)
    .await
    .unwrap();

    TestUser { id, token }
}

pub async fn admin(state: &AppState) -> TestUser {
    user_with(state, "admin@test.local", Role::Admin, |_| {}).await
}

pub async fn faculty(state: &AppState, email: &str) -> TestUser {
    user_with(state, email, Role::Faculty, |u| {
        u.department = Some("CSE".into());
    })
    .await
}

pub async fn student(state: &AppState, email: &str, usn: &str, class_name: &str) -> TestUser {
    let usn = usn.to_string();
    let class_name = class_name.to_string();
    user_with(state, email, Role::Student, move |u| {
        u.usn = Some(usn);
        u.class_name = Some(class_name);
        u.semester = Some(5);
        u.department = Some("CSE".into());
    })
    .await
}

pub fn body<T: DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}
