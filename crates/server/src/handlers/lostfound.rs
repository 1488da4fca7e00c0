use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::{QueryBuilder, Sqlite};

use crate::app_state::AppState;
use crate::auth::auth_user;
use crate::dates::parse_timestamp;
use crate::errors::ServerError;
use crate::models::lostfound::{ItemQuery, ItemRequest, ItemRow, ITEM_COLUMNS, ITEM_KINDS, ITEM_STATUSES};
use crate::models::users::MessageResponse;

use super::{non_empty, one_of, required};

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<Vec<ItemRow>>, ServerError> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {ITEM_COLUMNS} FROM lost_found WHERE 1 = 1"));
    if let Some(kind) = non_empty(&query.kind) {
        qb.push(" AND kind = ");
        qb.push_bind(kind);
    }
    if let Some(status) = non_empty(&query.status) {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    qb.push(" ORDER BY created_at DESC, id DESC");

    let rows = qb
        .build_query_as::<ItemRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(rows))
}

pub async fn get_item(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<ItemRow>, ServerError> {
    Ok(Json(load(&state, id).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ItemRequest>,
) -> Result<(StatusCode, Json<ItemRow>), ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let kind = required(&payload.kind)?;
    one_of("type", &kind, &ITEM_KINDS)?;
    let date = required(&payload.date)?;
    let date = parse_timestamp(&date).ok_or_else(|| ServerError::bad_request("Invalid date"))?;

    let sql = format!(
        "INSERT INTO lost_found (kind, item_name, category, description, location, date, \
         contact_name, contact_phone, reported_by, image_url) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING {ITEM_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ItemRow>(&sql)
        .bind(kind)
        .bind(required(&payload.item_name)?)
        .bind(required(&payload.category)?)
        .bind(required(&payload.description)?)
        .bind(required(&payload.location)?)
        .bind(date)
        .bind(required(&payload.contact_name)?)
        .bind(required(&payload.contact_phone)?)
        .bind(caller.id())
        .bind(non_empty(&payload.image_url))
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    tracing::info!(item = row.id, kind = %row.kind, "lost & found item reported");
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<ItemRequest>,
) -> Result<Json<ItemRow>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    let existing = load(&state, id).await?;
    caller.require_owner_or_admin(existing.reported_by, "update this item")?;

    if let Some(kind) = payload.kind.as_deref() {
        one_of("type", kind, &ITEM_KINDS)?;
    }
    if let Some(status) = payload.status.as_deref() {
        one_of("status", status, &ITEM_STATUSES)?;
    }
    let date = match non_empty(&payload.date) {
        Some(raw) => Some(parse_timestamp(&raw).ok_or_else(|| ServerError::bad_request("Invalid date"))?),
        None => None,
    };

    let sql = format!(
        "UPDATE lost_found SET kind = COALESCE(?1, kind), item_name = COALESCE(?2, item_name), \
         category = COALESCE(?3, category), description = COALESCE(?4, description), \
         location = COALESCE(?5, location), date = COALESCE(?6, date), \
         contact_name = COALESCE(?7, contact_name), contact_phone = COALESCE(?8, contact_phone), \
         status = COALESCE(?9, status), image_url = COALESCE(?10, image_url), \
         updated_at = datetime('now') WHERE id = ?11 RETURNING {ITEM_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ItemRow>(&sql)
        .bind(non_empty(&payload.kind))
        .bind(non_empty(&payload.item_name))
        .bind(non_empty(&payload.category))
        .bind(non_empty(&payload.description))
        .bind(non_empty(&payload.location))
        .bind(date)
        .bind(non_empty(&payload.contact_name))
        .bind(non_empty(&payload.contact_phone))
        .bind(non_empty(&payload.status))
        .bind(non_empty(&payload.image_url))
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(row))
}

pub async fn delete_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let result = sqlx::query("DELETE FROM lost_found WHERE id = ?1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    if result.rows_affected() == 0 {
        return Err(ServerError::not_found("Item not found"));
    }
    Ok(Json(MessageResponse::new("Item removed")))
}

async fn load(state: &AppState, id: i64) -> Result<ItemRow, ServerError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM lost_found WHERE id = ?1");
    sqlx::query_as::<_, ItemRow>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::not_found("Item not found"))
}
