use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::types::Json as SqlJson;
use sqlx::{QueryBuilder, Sqlite};

use crate::app_state::AppState;
use crate::auth::{auth_user, AuthUser};
use crate::dates::parse_timestamp;
use crate::errors::ServerError;
use crate::models::announcements::{
    AnnouncementQuery, AnnouncementResponse, AnnouncementRow, CreateAnnouncementRequest,
    UpdateAnnouncementRequest, AUDIENCES, CATEGORIES, PRIORITIES,
};
use crate::models::users::{MessageResponse, Role};

use super::one_of;

const LIST_LIMIT: i64 = 50;

const SELECT_ANNOUNCEMENT: &str = "SELECT a.id, a.title, a.content, a.category, \
     a.target_audience, a.target_classes, a.priority, a.attachments, a.published_by, \
     a.published_at, a.expires_at, a.is_active, a.created_at, a.updated_at, \
     u.name AS publisher_name, u.email AS publisher_email, u.role AS publisher_role, \
     (r.id IS NOT NULL) AS is_read, \
     (SELECT COUNT(*) FROM announcement_reads c WHERE c.announcement_id = a.id) AS read_count \
     FROM announcements a JOIN users u ON u.id = a.published_by \
     LEFT JOIN announcement_reads r ON r.announcement_id = a.id AND r.user_id = ";

pub async fn list_announcements(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AnnouncementQuery>,
) -> Result<Json<Vec<AnnouncementResponse>>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let audience = query
        .audience
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(caller.role.as_str())
        .to_string();

    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_ANNOUNCEMENT);
    qb.push_bind(caller.id());
    qb.push(" WHERE a.is_active = 1");
    qb.push(" AND (a.expires_at IS NULL OR a.expires_at > datetime('now'))");
    qb.push(" AND EXISTS (SELECT 1 FROM json_each(a.target_audience) t WHERE t.value IN (");
    qb.push_bind(audience);
    qb.push(", 'all'))");

    if caller.is(Role::Student) {
        if let Some(class_name) = caller.user.class_name.as_deref().filter(|c| !c.is_empty()) {
            qb.push(" AND (json_array_length(a.target_classes) = 0 OR EXISTS (SELECT 1 FROM json_each(a.target_classes) k WHERE k.value = ");
            qb.push_bind(class_name.to_string());
            qb.push("))");
        }
    }

    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        qb.push(" AND a.category = ");
        qb.push_bind(category.to_string());
    }
    if let Some(priority) = query.priority.as_deref().filter(|p| !p.is_empty()) {
        qb.push(" AND a.priority = ");
        qb.push_bind(priority.to_string());
    }

    qb.push(
        " ORDER BY CASE a.priority WHEN 'urgent' THEN 4 WHEN 'high' THEN 3 \
         WHEN 'medium' THEN 2 ELSE 1 END DESC, a.published_at DESC, a.id DESC LIMIT ",
    );
    qb.push_bind(LIST_LIMIT);

    let rows = qb
        .build_query_as::<AnnouncementRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(rows.into_iter().map(AnnouncementResponse::from).collect()))
}

pub async fn get_announcement(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<AnnouncementResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    let row = load(&state, id, caller.id())
        .await?
        .ok_or_else(|| ServerError::not_found("Announcement not found"))?;
    Ok(Json(row.into()))
}

pub async fn create_announcement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<AnnouncementResponse>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Faculty, Role::Admin])?;

    let title = payload.title.trim();
    let content = payload.content.trim();
    if title.is_empty() || content.is_empty() || payload.target_audience.is_empty() {
        return Err(ServerError::bad_request("Missing required fields"));
    }

    let category = payload.category.as_deref().unwrap_or("general");
    let priority = payload.priority.as_deref().unwrap_or("medium");
    one_of("category", category, &CATEGORIES)?;
    one_of("priority", priority, &PRIORITIES)?;
    check_audience(&payload.target_audience)?;
    let expires_at = normalize_expiry(payload.expires_at.as_deref())?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO announcements (title, content, category, target_audience, target_classes, \
         priority, attachments, published_by, expires_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING id",
    )
    .bind(title)
    .bind(content)
    .bind(category)
    .bind(SqlJson(&payload.target_audience))
    .bind(SqlJson(&payload.target_classes))
    .bind(priority)
    .bind(SqlJson(&payload.attachments))
    .bind(caller.id())
    .bind(expires_at)
    .fetch_one(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    tracing::info!(id, publisher = caller.id(), "announcement published");

    let row = load(&state, id, caller.id())
        .await?
        .ok_or_else(|| ServerError::internal(format!("announcement {id} vanished after insert")))?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_announcement(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<UpdateAnnouncementRequest>,
) -> Result<Json<AnnouncementResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    let existing = owned(&state, &caller, id, "update this announcement").await?;

    if let Some(category) = payload.category.as_deref() {
        one_of("category", category, &CATEGORIES)?;
    }
    if let Some(priority) = payload.priority.as_deref() {
        one_of("priority", priority, &PRIORITIES)?;
    }
    if let Some(audience) = payload.target_audience.as_ref() {
        if audience.is_empty() {
            return Err(ServerError::bad_request("Target audience cannot be empty"));
        }
        check_audience(audience)?;
    }
    let expires_at = normalize_expiry(payload.expires_at.as_deref())?;

    sqlx::query(
        "UPDATE announcements SET title = COALESCE(?1, title), content = COALESCE(?2, content), \
         category = COALESCE(?3, category), target_audience = COALESCE(?4, target_audience), \
         target_classes = COALESCE(?5, target_classes), priority = COALESCE(?6, priority), \
         attachments = COALESCE(?7, attachments), expires_at = COALESCE(?8, expires_at), \
         is_active = COALESCE(?9, is_active), updated_at = datetime('now') WHERE id = ?10",
    )
    .bind(payload.title.as_deref().map(str::trim).filter(|t| !t.is_empty()))
    .bind(payload.content.as_deref().map(str::trim).filter(|c| !c.is_empty()))
    .bind(payload.category.as_deref())
    .bind(payload.target_audience.as_ref().map(SqlJson))
    .bind(payload.target_classes.as_ref().map(SqlJson))
    .bind(payload.priority.as_deref())
    .bind(payload.attachments.as_ref().map(SqlJson))
    .bind(expires_at)
    .bind(payload.is_active)
    .bind(existing.id)
    .execute(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    let row = load(&state, id, caller.id())
        .await?
        .ok_or_else(|| ServerError::not_found("Announcement not found"))?;
    Ok(Json(row.into()))
}

/// Soft delete: the row stays for the guardian's retention purge.
pub async fn delete_announcement(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    let existing = owned(&state, &caller, id, "delete this announcement").await?;

    sqlx::query(
        "UPDATE announcements SET is_active = 0, updated_at = datetime('now') WHERE id = ?1",
    )
    .bind(existing.id)
    .execute(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    Ok(Json(MessageResponse::new("Announcement deleted successfully")))
}

pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM announcements WHERE id = ?1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    if exists.is_none() {
        return Err(ServerError::not_found("Announcement not found"));
    }

    sqlx::query("INSERT OR IGNORE INTO announcement_reads (announcement_id, user_id) VALUES (?1, ?2)")
        .bind(id)
        .bind(caller.id())
        .execute(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(MessageResponse::new("Marked as read")))
}

async fn load(
    state: &AppState,
    id: i64,
    viewer: i64,
) -> Result<Option<AnnouncementRow>, ServerError> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_ANNOUNCEMENT);
    qb.push_bind(viewer);
    qb.push(" WHERE a.id = ");
    qb.push_bind(id);

    qb.build_query_as::<AnnouncementRow>()
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)
}

async fn owned(
    state: &AppState,
    caller: &AuthUser,
    id: i64,
    what: &str,
) -> Result<AnnouncementRow, ServerError> {
    let row = load(state, id, caller.id())
        .await?
        .ok_or_else(|| ServerError::not_found("Announcement not found"))?;
    caller.require_owner_or_admin(row.published_by, what)?;
    Ok(row)
}

fn check_audience(audience: &[String]) -> Result<(), ServerError> {
    for value in audience {
        one_of("targetAudience", value, &AUDIENCES)?;
    }
    Ok(())
}

fn normalize_expiry(raw: Option<&str>) -> Result<Option<String>, ServerError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| ServerError::bad_request("Invalid expiresAt")),
    }
}
