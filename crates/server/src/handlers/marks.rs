use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::{QueryBuilder, Sqlite};

use crate::app_state::AppState;
use crate::auth::auth_user;
use crate::errors::ServerError;
use crate::models::marks::{
    MarkRow, MarksQuery, MarksStats, PublishRequest, UploadMarksRequest, UploadMarksResponse,
    MARK_COLUMNS,
};
use crate::models::users::{MessageResponse, Role, UserRow, USER_COLUMNS};

use super::non_empty;

pub async fn upload_marks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UploadMarksRequest>,
) -> Result<(StatusCode, Json<UploadMarksResponse>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Faculty, Role::Admin])?;

    let class_name = payload.class_name.trim();
    let subject = payload.subject.trim();
    let exam_type = payload.exam_type.trim();
    if class_name.is_empty()
        || subject.is_empty()
        || exam_type.is_empty()
        || payload.marks_data.is_empty()
    {
        return Err(ServerError::bad_request("Missing required fields"));
    }
    let max_marks = payload
        .max_marks
        .filter(|m| *m > 0.0)
        .ok_or_else(|| ServerError::bad_request("maxMarks must be greater than zero"))?;

    for entry in &payload.marks_data {
        match entry.obtained_marks {
            Some(m) if (0.0..=max_marks).contains(&m) => {}
            _ => {
                return Err(ServerError::bad_request(format!(
                    "Invalid obtainedMarks for {}",
                    entry.student_usn
                )))
            }
        }
    }

    let mut tx = state.pool.begin().await.map_err(ServerError::internal)?;
    let mut records = Vec::with_capacity(payload.marks_data.len());

    for entry in &payload.marks_data {
        let usn = entry.student_usn.trim();
        let student: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM users WHERE usn = ?1 AND role = 'student'")
                .bind(usn)
                .fetch_optional(&mut *tx)
                .await
                .map_err(ServerError::internal)?;
        let Some((student_id, stored_name)) = student else {
            tracing::warn!(usn, "marks skipped for unknown student");
            continue;
        };
        let name = entry
            .student_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&stored_name);

        let sql = format!(
            "INSERT INTO marks (student_id, student_usn, student_name, class_name, subject, \
             exam_type, max_marks, obtained_marks, uploaded_by) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(student_usn, subject, exam_type) DO UPDATE SET \
             obtained_marks = excluded.obtained_marks, max_marks = excluded.max_marks, \
             class_name = excluded.class_name, uploaded_by = excluded.uploaded_by, \
             date = datetime('now'), updated_at = datetime('now') RETURNING {MARK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, MarkRow>(&sql)
            .bind(student_id)
            .bind(usn)
            .bind(name)
            .bind(class_name)
            .bind(subject)
            .bind(exam_type)
            .bind(max_marks)
            .bind(entry.obtained_marks.unwrap_or_default())
            .bind(caller.id())
            .fetch_one(&mut *tx)
            .await
            .map_err(ServerError::internal)?;
        records.push(row);
    }

    tx.commit().await.map_err(ServerError::internal)?;
    tracing::info!(class = class_name, subject, exam_type, count = records.len(), "marks uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadMarksResponse {
            message: "Marks uploaded successfully".to_string(),
            count: records.len(),
            records,
        }),
    ))
}

pub async fn list_marks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MarksQuery>,
) -> Result<Json<Vec<MarkRow>>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {MARK_COLUMNS} FROM marks WHERE 1 = 1"));
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
    if let Some(exam_type) = non_empty(&query.exam_type) {
        qb.push(" AND exam_type = ");
        qb.push_bind(exam_type);
    }
    qb.push(" ORDER BY date DESC, id DESC");

    let rows = qb
        .build_query_as::<MarkRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(rows))
}

pub async fn marks_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MarksStats>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let (average, total_results): (Option<f64>, i64) = sqlx::query_as(
        "SELECT AVG(obtained_marks * 100.0 / max_marks), COUNT(*) FROM marks WHERE max_marks > 0",
    )
    .fetch_one(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    Ok(Json(MarksStats {
        average_percentage: (average.unwrap_or_default() * 100.0).round() / 100.0,
        total_results,
    }))
}

/// Notifies every student of `branch`/`semester` that has marks on record
/// for that semester's classes.
pub async fn publish_results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PublishRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let branch = payload.branch.trim();
    let semester = payload
        .semester
        .filter(|_| !branch.is_empty())
        .ok_or_else(|| ServerError::bad_request("Branch and semester are required"))?;

    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = 'student' AND department = ?1 AND semester = ?2"
    );
    let students = sqlx::query_as::<_, UserRow>(&sql)
        .bind(branch)
        .bind(semester)
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    if students.is_empty() {
        return Err(ServerError::not_found("No students found for this selection"));
    }

    let class_pattern = format!("%{branch}%Sem {semester}%");
    let label = format!("Semester {semester}");
    let mut notified = 0;

    for student in &students {
        let Some(usn) = student.usn.as_deref() else {
            continue;
        };
        let has_marks: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM marks WHERE student_usn = ?1 AND class_name LIKE ?2",
        )
        .bind(usn)
        .bind(&class_pattern)
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;

        if has_marks > 0 {
            state.notifier.notify_results(student, &label).await;
            notified += 1;
        }
    }

    tracing::info!(branch, semester, notified, "results published");

    Ok(Json(MessageResponse::new(format!(
        "Results published. Notifications sent to {notified} students."
    ))))
}
