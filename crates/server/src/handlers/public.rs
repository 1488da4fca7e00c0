use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::app_state::AppState;
use crate::errors::ServerError;
use crate::models::portal::{HealthResponse, PublicStats};
use crate::models::users::MessageResponse;

const STATS_KEY: &str = "public_stats";
const UPTIME_TARGET: f64 = 99.9;

pub async fn banner(State(state): State<AppState>) -> Json<MessageResponse> {
    Json(MessageResponse::new(format!("{} API is running", state.app_name)))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Landing-page counters, served from the TTL cache.
pub async fn public_stats(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let value = state
        .cache
        .get_or_set(STATS_KEY, || async {
            let stats = load_stats(&state).await?;
            serde_json::to_value(stats).map_err(ServerError::internal)
        })
        .await?;
    Ok(Json(value))
}

async fn load_stats(state: &AppState) -> Result<PublicStats, ServerError> {
    let (students, faculty): (i64, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(role = 'student'), 0), COALESCE(SUM(role = 'faculty'), 0) FROM users",
    )
    .fetch_one(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    let today: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM announcements WHERE is_active = 1 \
         AND published_at >= datetime('now', 'start of day')",
    )
    .fetch_one(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    let notices = if today > 0 {
        today
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM announcements WHERE is_active = 1")
            .fetch_one(&state.pool)
            .await
            .map_err(ServerError::internal)?
    };

    tracing::debug!(students, faculty, notices, "public stats refreshed");

    Ok(PublicStats {
        students,
        faculty,
        notices,
        uptime: UPTIME_TARGET,
    })
}
