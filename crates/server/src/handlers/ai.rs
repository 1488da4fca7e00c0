use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::ai::{build_messages, profile_line, ChatError, BUSY_REPLY, TIMEOUT_REPLY, UNAVAILABLE_MESSAGE};
use crate::app_state::AppState;
use crate::auth::{auth_user, AuthUser};
use crate::errors::ServerError;
use crate::models::portal::{ChatReply, ChatRequest};
use crate::models::users::Role;

const CONTEXT_ANNOUNCEMENTS: i64 = 5;
const CONTEXT_MARKS: i64 = 5;

pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ServerError::bad_request("Message is required"));
    }

    let portal_context = match payload.context.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(ctx) => ctx.to_string(),
        None => portal_context(&state, &caller).await?,
    };

    let messages = build_messages(
        &state.system_prompt,
        &profile_line(&caller.user, caller.role),
        &portal_context,
        &payload.history,
        message,
    );

    let outcome = tokio::time::timeout(state.chat_timeout, state.chat.complete(&messages)).await;

    let reply = match outcome {
        Ok(Ok(reply)) => reply,
        Err(_) => {
            tracing::warn!(
                user_id = caller.id(),
                timeout_ms = state.chat_timeout.as_millis() as u64,
                "chat provider timed out"
            );
            TIMEOUT_REPLY.to_string()
        }
        Ok(Err(ChatError::RateLimited)) => {
            tracing::warn!(user_id = caller.id(), "chat provider rate limited");
            BUSY_REPLY.to_string()
        }
        Ok(Err(e)) => {
            tracing::error!(user_id = caller.id(), error = %e, "chat provider failed");
            return Err(ServerError::new(StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_MESSAGE));
        }
    };

    Ok(Json(ChatReply { reply }))
}

/// Newest announcements for the caller's audience; students also get their
/// attendance summary and latest marks.
async fn portal_context(state: &AppState, caller: &AuthUser) -> Result<String, ServerError> {
    let announcements: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT title, content, category FROM announcements a WHERE is_active = 1 \
         AND EXISTS (SELECT 1 FROM json_each(a.target_audience) t WHERE t.value IN (?1, 'all')) \
         ORDER BY published_at DESC, id DESC LIMIT ?2",
    )
    .bind(caller.role.as_str())
    .bind(CONTEXT_ANNOUNCEMENTS)
    .fetch_all(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    let mut lines: Vec<String> = announcements
        .into_iter()
        .map(|(title, content, category)| {
            format!("Title: {title}, Content: {content}, Category: {category}")
        })
        .collect();

    if caller.is(Role::Student) {
        if let Some(usn) = caller.user.usn.as_deref() {
            let (total, present): (i64, i64) = sqlx::query_as(
                "SELECT COUNT(*), COALESCE(SUM(status = 'present'), 0) FROM attendance \
                 WHERE student_usn = ?1",
            )
            .bind(usn)
            .fetch_one(&state.pool)
            .await
            .map_err(ServerError::internal)?;
            if total > 0 {
                lines.push(format!(
                    "Attendance: present {present} of {total} classes ({:.1}%)",
                    present as f64 * 100.0 / total as f64
                ));
            }

            let marks: Vec<(String, String, f64, f64)> = sqlx::query_as(
                "SELECT subject, exam_type, obtained_marks, max_marks FROM marks \
                 WHERE student_usn = ?1 ORDER BY date DESC, id DESC LIMIT ?2",
            )
            .bind(usn)
            .bind(CONTEXT_MARKS)
            .fetch_all(&state.pool)
            .await
            .map_err(ServerError::internal)?;
            for (subject, exam_type, obtained, max) in marks {
                lines.push(format!("Marks: {subject} ({exam_type}) {obtained}/{max}"));
            }
        }
    }

    Ok(lines.join("\n"))
}
