//! Chat completion port plus the OpenAI-compatible adapter behind it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::AiConfig;
use crate::models::users::{Role, UserRow};

pub const TIMEOUT_REPLY: &str =
    "I'm taking longer than usual to respond. Please try again in a moment.";
pub const BUSY_REPLY: &str =
    "I'm receiving a lot of questions right now. Please try again in a minute.";
pub const UNAVAILABLE_MESSAGE: &str =
    "AI Assistant is currently unavailable. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// A prior turn as the web client sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryTurn {
    pub role: String,
    pub parts: Vec<HistoryPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryPart {
    pub text: String,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat provider not configured: {0}")]
    NotConfigured(String),
    #[error("chat provider rate limited the request")]
    RateLimited,
    #[error("chat provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("chat transport error: {0}")]
    Transport(String),
    #[error("chat response malformed: {0}")]
    Malformed(String),
}

#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key: Option<String>,
}

impl OpenAiProvider {
    /// Reads the API key from the environment variable named in the config.
    pub fn from_config(cfg: &AiConfig) -> Result<Self, ChatError> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            api_key,
        })
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::NotConfigured("missing API key".to_string()))?;

        let body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, turns = messages.len(), "chat completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ChatError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| ChatError::Malformed(e.to_string()))?;

        extract_reply(&payload)
    }
}

fn extract_reply(payload: &Value) -> Result<String, ChatError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ChatError::Malformed("no choices[0].message.content".to_string()))
}

/// Describes the caller to the model.
pub fn profile_line(user: &UserRow, role: Role) -> String {
    let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
    match role {
        Role::Student => format!(
            "User Role: student. Student Info: USN {}, Class {}, Dept {}",
            na(&user.usn),
            na(&user.class_name),
            na(&user.department)
        ),
        Role::Faculty => format!(
            "User Role: faculty. Faculty Info: ID {}, Dept {}",
            na(&user.employee_id),
            na(&user.department)
        ),
        other => format!("User Role: {other}."),
    }
}

/// System prompt, caller profile, portal context, prior turns, then the
/// new message. History roles other than `user` become `assistant`.
pub fn build_messages(
    system_prompt: &str,
    profile: &str,
    portal_context: &str,
    history: &[HistoryTurn],
    message: &str,
) -> Vec<ChatMessage> {
    let context = if portal_context.trim().is_empty() {
        "No additional context provided."
    } else {
        portal_context
    };

    let mut messages = vec![
        ChatMessage::new("system", system_prompt),
        ChatMessage::new("system", profile),
        ChatMessage::new("system", format!("Context from portal data:\n{context}")),
    ];

    for turn in history {
        let Some(text) = turn.parts.first().map(|p| p.text.clone()) else {
            continue;
        };
        let role = if turn.role == "user" { "user" } else { "assistant" };
        messages.push(ChatMessage::new(role, text));
    }

    messages.push(ChatMessage::new("user", message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_roles_are_normalized() {
        let history = vec![
            HistoryTurn {
                role: "user".into(),
                parts: vec![HistoryPart { text: "hi".into() }],
            },
            HistoryTurn {
                role: "model".into(),
                parts: vec![HistoryPart { text: "hello".into() }],
            },
            HistoryTurn {
                role: "user".into(),
                parts: vec![],
            },
        ];

        let msgs = build_messages("sys", "profile", "", &history, "when is the exam?");

        let roles: Vec<&str> = msgs.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "system", "system", "user", "assistant", "user"]);
        assert!(msgs[2].content.ends_with("No additional context provided."));
        assert_eq!(msgs[5].content, "when is the exam?");
    }

    #[test]
    fn reply_is_read_from_first_choice() {
        let payload = json!({"choices": [{"message": {"role": "assistant", "content": "Hi"}}]});
        assert_eq!(extract_reply(&payload).unwrap(), "Hi");
        assert!(extract_reply(&json!({"choices": []})).is_err());
    }
}
