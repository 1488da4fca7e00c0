use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::{QueryBuilder, Sqlite};

use crate::app_state::AppState;
use crate::auth::auth_user;
use crate::errors::ServerError;
use crate::models::attendance::Pagination;
use crate::models::materials::{
    is_link_only, MaterialListResponse, MaterialQuery, MaterialResponse, MaterialRow,
    UploadMaterialRequest,
};
use crate::models::users::{MessageResponse, Role};

use super::{non_empty, page_window};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 50;

const SELECT_MATERIAL: &str = "SELECT m.id, m.title, m.subject, m.class_name, m.kind, \
     m.file_url, m.size, m.uploaded_by, u.name AS uploader_name, u.role AS uploader_role, \
     m.created_at, m.updated_at FROM study_materials m JOIN users u ON u.id = m.uploaded_by";

pub async fn upload_material(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UploadMaterialRequest>,
) -> Result<(StatusCode, Json<MaterialResponse>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Faculty, Role::Admin])?;

    let title = payload.title.trim();
    let subject = payload.subject.trim();
    let class_name = payload.class_name.trim();
    let file_url = payload.file_url.trim();
    if title.is_empty() || subject.is_empty() || class_name.is_empty() || file_url.is_empty() {
        return Err(ServerError::bad_request("Please provide all required fields"));
    }
    if !is_link_only(file_url) {
        return Err(ServerError::bad_request(
            "Direct file uploads not allowed. Please use external storage (Google Drive, Dropbox) and provide the link.",
        ));
    }

    let kind = non_empty(&payload.kind).unwrap_or_else(|| "LINK".to_string());
    let size = non_empty(&payload.size).unwrap_or_else(|| "Unknown".to_string());

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO study_materials (title, subject, class_name, kind, file_url, size, uploaded_by) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
    )
    .bind(title)
    .bind(subject)
    .bind(class_name)
    .bind(&kind)
    .bind(file_url)
    .bind(&size)
    .bind(caller.id())
    .fetch_one(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    let row = load(&state, id).await?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn list_materials(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MaterialQuery>,
) -> Result<Json<MaterialListResponse>, ServerError> {
    auth_user(&state, &headers).await?;
    let (page, limit, offset) = page_window(query.page, query.limit, DEFAULT_LIMIT, MAX_LIMIT);

    let mut count_qb =
        QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM study_materials m WHERE 1 = 1");
    push_filters(&mut count_qb, &query);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_MATERIAL);
    qb.push(" WHERE 1 = 1");
    push_filters(&mut qb, &query);
    qb.push(" ORDER BY m.created_at DESC, m.id DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    let rows = qb
        .build_query_as::<MaterialRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(MaterialListResponse {
        materials: rows.into_iter().map(MaterialResponse::from).collect(),
        pagination: Pagination::new(total, page, limit),
    }))
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &MaterialQuery) {
    if let Some(class_name) = non_empty(&query.class_name).filter(|c| c != "All Classes") {
        qb.push(" AND m.class_name = ");
        qb.push_bind(class_name);
    }
    if let Some(subject) = non_empty(&query.subject).filter(|s| s != "All Subjects") {
        qb.push(" AND m.subject = ");
        qb.push_bind(subject);
    }
    if let Some(search) = non_empty(&query.search) {
        qb.push(" AND instr(lower(m.title), lower(");
        qb.push_bind(search);
        qb.push(")) > 0");
    }
}

pub async fn delete_material(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Faculty, Role::Admin])?;

    let material = load(&state, id).await?;
    caller.require_owner_or_admin(material.uploaded_by, "delete this material")?;

    sqlx::query("DELETE FROM study_materials WHERE id = ?1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(MessageResponse::new("Material deleted")))
}

async fn load(state: &AppState, id: i64) -> Result<MaterialRow, ServerError> {
    let sql = format!("{SELECT_MATERIAL} WHERE m.id = ?1");
    sqlx::query_as::<_, MaterialRow>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::not_found("Material not found"))
}
