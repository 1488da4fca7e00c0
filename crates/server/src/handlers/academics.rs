use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::types::Json as SqlJson;

use crate::app_state::AppState;
use crate::auth::auth_user;
use crate::errors::{map_db_error, ServerError};
use crate::models::academics::{
    DepartmentRequest, DepartmentRow, SubjectRequest, SubjectRow, TimetableRequest,
    TimetableResponse, TimetableRow, DAYS,
};
use crate::models::users::MessageResponse;

use super::{non_empty, one_of, required};

const DEPARTMENT_COLUMNS: &str = "id, name, code, duration, students, hod, created_at, updated_at";
const SUBJECT_COLUMNS: &str = "id, name, code, semester, credits, department, created_at, updated_at";
const TIMETABLE_COLUMNS: &str = "id, class_name, day, slots, created_at, updated_at";

pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<Json<Vec<DepartmentRow>>, ServerError> {
    let sql = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments ORDER BY code");
    let rows = sqlx::query_as::<_, DepartmentRow>(&sql)
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(rows))
}

pub async fn create_department(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DepartmentRequest>,
) -> Result<(StatusCode, Json<DepartmentRow>), ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;

    let sql = format!(
        "INSERT INTO departments (name, code, duration, students, hod) \
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {DEPARTMENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, DepartmentRow>(&sql)
        .bind(required(&payload.name)?)
        .bind(required(&payload.code)?)
        .bind(required(&payload.duration)?)
        .bind(payload.students.unwrap_or(0))
        .bind(required(&payload.hod)?)
        .fetch_one(&state.pool)
        .await
        .map_err(|e| map_db_error(e, "Department code already exists"))?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update_department(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<DepartmentRequest>,
) -> Result<Json<DepartmentRow>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;

    let sql = format!(
        "UPDATE departments SET name = COALESCE(?1, name), code = COALESCE(?2, code), \
         duration = COALESCE(?3, duration), students = COALESCE(?4, students), \
         hod = COALESCE(?5, hod), updated_at = datetime('now') WHERE id = ?6 \
         RETURNING {DEPARTMENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, DepartmentRow>(&sql)
        .bind(non_empty(&payload.name))
        .bind(non_empty(&payload.code))
        .bind(non_empty(&payload.duration))
        .bind(payload.students)
        .bind(non_empty(&payload.hod))
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| map_db_error(e, "Department code already exists"))?
        .ok_or_else(|| ServerError::not_found("Department not found"))?;
    Ok(Json(row))
}

pub async fn delete_department(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;
    delete_by_id(&state, "departments", id, "Department").await
}

pub async fn list_subjects(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectRow>>, ServerError> {
    let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY department, semester, code");
    let rows = sqlx::query_as::<_, SubjectRow>(&sql)
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(rows))
}

pub async fn create_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubjectRequest>,
) -> Result<(StatusCode, Json<SubjectRow>), ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;

    let credits = payload
        .credits
        .ok_or_else(|| ServerError::bad_request("Missing required fields"))?;
    let sql = format!(
        "INSERT INTO subjects (name, code, semester, credits, department) \
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {SUBJECT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SubjectRow>(&sql)
        .bind(required(&payload.name)?)
        .bind(required(&payload.code)?)
        .bind(required(&payload.semester)?)
        .bind(credits)
        .bind(required(&payload.department)?)
        .fetch_one(&state.pool)
        .await
        .map_err(|e| map_db_error(e, "Subject code already exists"))?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<SubjectRequest>,
) -> Result<Json<SubjectRow>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;

    let sql = format!(
        "UPDATE subjects SET name = COALESCE(?1, name), code = COALESCE(?2, code), \
         semester = COALESCE(?3, semester), credits = COALESCE(?4, credits), \
         department = COALESCE(?5, department), updated_at = datetime('now') WHERE id = ?6 \
         RETURNING {SUBJECT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SubjectRow>(&sql)
        .bind(non_empty(&payload.name))
        .bind(non_empty(&payload.code))
        .bind(non_empty(&payload.semester))
        .bind(payload.credits)
        .bind(non_empty(&payload.department))
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| map_db_error(e, "Subject code already exists"))?
        .ok_or_else(|| ServerError::not_found("Subject not found"))?;
    Ok(Json(row))
}

pub async fn delete_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;
    delete_by_id(&state, "subjects", id, "Subject").await
}

pub async fn list_timetables(
    State(state): State<AppState>,
) -> Result<Json<Vec<TimetableResponse>>, ServerError> {
    let sql = format!(
        "SELECT {TIMETABLE_COLUMNS} FROM timetables ORDER BY class_name, \
         CASE day WHEN 'Monday' THEN 1 WHEN 'Tuesday' THEN 2 WHEN 'Wednesday' THEN 3 \
         WHEN 'Thursday' THEN 4 WHEN 'Friday' THEN 5 WHEN 'Saturday' THEN 6 ELSE 7 END"
    );
    let rows = sqlx::query_as::<_, TimetableRow>(&sql)
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(rows.into_iter().map(TimetableResponse::from).collect()))
}

pub async fn create_timetable(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TimetableRequest>,
) -> Result<(StatusCode, Json<TimetableResponse>), ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;

    let class_name = required(&payload.class_name)?;
    let day = required(&payload.day)?;
    one_of("day", &day, &DAYS)?;
    let slots = trimmed_slots(payload.slots.unwrap_or_default());

    let sql = format!(
        "INSERT INTO timetables (class_name, day, slots) VALUES (?1, ?2, ?3) RETURNING {TIMETABLE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, TimetableRow>(&sql)
        .bind(class_name)
        .bind(day)
        .bind(SqlJson(slots))
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_timetable(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<TimetableRequest>,
) -> Result<Json<TimetableResponse>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;

    if let Some(day) = payload.day.as_deref() {
        one_of("day", day, &DAYS)?;
    }
    let sql = format!(
        "UPDATE timetables SET class_name = COALESCE(?1, class_name), day = COALESCE(?2, day), \
         slots = COALESCE(?3, slots), updated_at = datetime('now') WHERE id = ?4 \
         RETURNING {TIMETABLE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, TimetableRow>(&sql)
        .bind(non_empty(&payload.class_name))
        .bind(non_empty(&payload.day))
        .bind(payload.slots.map(|s| SqlJson(trimmed_slots(s))))
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::not_found("Timetable not found"))?;
    Ok(Json(row.into()))
}

pub async fn delete_timetable(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;
    delete_by_id(&state, "timetables", id, "Timetable").await
}

async fn delete_by_id(
    state: &AppState,
    table: &'static str,
    id: i64,
    label: &str,
) -> Result<Json<MessageResponse>, ServerError> {
    let sql = format!("DELETE FROM {table} WHERE id = ?1");
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    if result.rows_affected() == 0 {
        return Err(ServerError::not_found(format!("{label} not found")));
    }
    Ok(Json(MessageResponse::new(format!("{label} removed"))))
}

fn trimmed_slots(slots: Vec<String>) -> Vec<String> {
    slots.into_iter().map(|s| s.trim().to_string()).collect()
}
