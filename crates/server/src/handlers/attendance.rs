use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::{QueryBuilder, Sqlite};

use crate::app_state::AppState;
use crate::auth::{auth_user, AuthUser};
use crate::dates::parse_date;
use crate::errors::ServerError;
use crate::models::attendance::{
    AttendanceListResponse, AttendanceQuery, AttendanceReport, AttendanceRow, AttendanceStats,
    ClassQuery, ClassStudent, MarkAttendanceRequest, MarkAttendanceResponse, Pagination,
    ReportQuery, ReportStats, ATTENDANCE_COLUMNS, STATUSES,
};
use crate::models::users::Role;

use super::{non_empty, one_of, page_window};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

/// Upserts one record per student for the class/subject/date; a second
/// submission for the same day overwrites status and remarks.
pub async fn mark_attendance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<MarkAttendanceRequest>,
) -> Result<(StatusCode, Json<MarkAttendanceResponse>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Faculty, Role::Admin])?;

    let class_name = payload.class_name.trim();
    let subject = payload.subject.trim();
    if class_name.is_empty()
        || subject.is_empty()
        || payload.date.trim().is_empty()
        || payload.attendance_data.is_empty()
    {
        return Err(ServerError::bad_request("Missing required fields"));
    }
    let date = parse_date(&payload.date).ok_or_else(|| ServerError::bad_request("Invalid date"))?;
    for entry in &payload.attendance_data {
        if entry.student_usn.trim().is_empty() {
            return Err(ServerError::bad_request("Each record needs a studentUsn"));
        }
        one_of("status", &entry.status, &STATUSES)?;
    }

    let mut tx = state.pool.begin().await.map_err(ServerError::internal)?;
    let mut records = Vec::with_capacity(payload.attendance_data.len());

    for entry in &payload.attendance_data {
        let usn = entry.student_usn.trim();
        let student: Option<(i64, String)> = sqlx::query_as(
            "SELECT id, name FROM users WHERE usn = ?1 AND role = 'student'",
        )
        .bind(usn)
        .fetch_optional(&mut *tx)
        .await
        .map_err(ServerError::internal)?;

        let Some((student_id, stored_name)) = student else {
            tracing::warn!(usn, "attendance skipped for unknown student");
            continue;
        };
        let name = entry
            .student_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&stored_name);

        let sql = format!(
            "INSERT INTO attendance (student_id, student_usn, student_name, class_name, subject, \
             date, status, marked_by, remarks) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(student_usn, date, subject) DO UPDATE SET status = excluded.status, \
             remarks = excluded.remarks, class_name = excluded.class_name, \
             marked_by = excluded.marked_by, updated_at = datetime('now') \
             RETURNING {ATTENDANCE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(student_id)
            .bind(usn)
            .bind(name)
            .bind(class_name)
            .bind(subject)
            .bind(&date)
            .bind(&entry.status)
            .bind(caller.id())
            .bind(entry.remarks.as_deref().unwrap_or(""))
            .fetch_one(&mut *tx)
            .await
            .map_err(ServerError::internal)?;
        records.push(row);
    }

    tx.commit().await.map_err(ServerError::internal)?;

    tracing::info!(class = class_name, subject, date = %date, count = records.len(), "attendance marked");

    Ok((
        StatusCode::CREATED,
        Json(MarkAttendanceResponse {
            message: "Attendance marked successfully".to_string(),
            count: records.len(),
            records,
        }),
    ))
}

pub async fn list_attendance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<AttendanceListResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    let (page, limit, offset) = page_window(query.page, query.limit, DEFAULT_LIMIT, MAX_LIMIT);

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM attendance WHERE 1 = 1");
    push_list_filters(&mut count_qb, &caller, &query);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE 1 = 1"
    ));
    push_list_filters(&mut qb, &caller, &query);
    qb.push(" ORDER BY date DESC, id DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    let records = qb
        .build_query_as::<AttendanceRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(AttendanceListResponse {
        records,
        pagination: Pagination::new(total, page, limit),
    }))
}

fn push_list_filters(qb: &mut QueryBuilder<'_, Sqlite>, caller: &AuthUser, query: &AttendanceQuery) {
    match caller.forced_usn() {
        Some(usn) => {
            qb.push(" AND student_usn = ");
            qb.push_bind(usn);
        }
        None => {
            if let Some(usn) = non_empty(&query.student_usn) {
                qb.push(" AND student_usn = ");
                qb.push_bind(usn);
            }
            if let Some(class_name) = non_empty(&query.class_name) {
                qb.push(" AND class_name = ");
                qb.push_bind(class_name);
            }
        }
    }
    if let Some(subject) = non_empty(&query.subject) {
        qb.push(" AND subject = ");
        qb.push_bind(subject);
    }
    if let Some(date) = query.date.as_deref().and_then(parse_date) {
        qb.push(" AND date = ");
        qb.push_bind(date);
    }
    if let Some(status) = non_empty(&query.status) {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
}

pub async fn attendance_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AttendanceReport>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE 1 = 1"
    ));
    match caller.forced_usn() {
        Some(usn) => {
            qb.push(" AND student_usn = ");
            qb.push_bind(usn);
        }
        None => {
            if let Some(usn) = non_empty(&query.student_usn) {
                qb.push(" AND student_usn = ");
                qb.push_bind(usn);
            }
            if let Some(class_name) = non_empty(&query.class_name) {
                qb.push(" AND class_name = ");
                qb.push_bind(class_name);
            }
        }
    }
    if let Some(subject) = non_empty(&query.subject) {
        qb.push(" AND subject = ");
        qb.push_bind(subject);
    }
    if let Some(start) = query.start_date.as_deref().and_then(parse_date) {
        qb.push(" AND date >= ");
        qb.push_bind(start);
    }
    if let Some(end) = query.end_date.as_deref().and_then(parse_date) {
        qb.push(" AND date <= ");
        qb.push_bind(end);
    }
    qb.push(" ORDER BY date DESC, id DESC");

    let records = qb
        .build_query_as::<AttendanceRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    let stats = ReportStats::tally(records.iter().map(|r| r.status.as_str()));
    Ok(Json(AttendanceReport { stats, records }))
}

pub async fn class_students(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ClassQuery>,
) -> Result<Json<Vec<ClassStudent>>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Faculty, Role::Admin])?;

    let class_name =
        non_empty(&query.class_name).ok_or_else(|| ServerError::bad_request("Class is required"))?;

    let students = sqlx::query_as::<_, ClassStudent>(
        "SELECT id, name, usn, email FROM users WHERE role = 'student' AND class_name = ?1 \
         ORDER BY usn, name",
    )
    .bind(class_name)
    .fetch_all(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    Ok(Json(students))
}

pub async fn list_classes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, ServerError> {
    auth_user(&state, &headers).await?;

    let classes: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT class_name FROM users WHERE role = 'student' \
         AND class_name IS NOT NULL AND class_name <> '' ORDER BY class_name",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    Ok(Json(classes))
}

pub async fn attendance_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AttendanceStats>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let (total_records, present_records): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(status = 'present'), 0) FROM attendance",
    )
    .fetch_one(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    let percentage = if total_records > 0 {
        (present_records as f64 * 1000.0 / total_records as f64).round() / 10.0
    } else {
        0.0
    };

    Ok(Json(AttendanceStats {
        total_records,
        present_records,
        percentage,
    }))
}
