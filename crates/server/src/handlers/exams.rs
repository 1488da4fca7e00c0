use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::types::Json as SqlJson;
use sqlx::{QueryBuilder, Sqlite};

use crate::app_state::AppState;
use crate::auth::auth_user;
use crate::dates::parse_timestamp;
use crate::errors::{map_db_error, ServerError};
use crate::models::exams::{
    score_answers, CreateExamRequest, ExamDetail, ExamRow, ExamSummary, ExamSummaryRow,
    QuestionRow, QuestionView, SubmitExamRequest, SubmitExamResponse, EXAM_COLUMNS,
};
use crate::models::users::{MessageResponse, Role, UserRow, USER_COLUMNS};

pub async fn create_exam(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateExamRequest>,
) -> Result<(StatusCode, Json<ExamDetail>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Faculty, Role::Admin])?;

    let title = payload.title.trim();
    let branch = payload.branch.trim();
    let Some(semester) = payload.semester else {
        return Err(ServerError::bad_request("Missing required fields"));
    };
    if title.is_empty() || branch.is_empty() || payload.date.trim().is_empty() {
        return Err(ServerError::bad_request("Missing required fields"));
    }
    let date = parse_timestamp(&payload.date).ok_or_else(|| ServerError::bad_request("Invalid date"))?;
    let duration = payload.duration.unwrap_or(60);
    if duration <= 0 {
        return Err(ServerError::bad_request("Duration must be positive"));
    }

    for (idx, q) in payload.questions.iter().enumerate() {
        if q.question.trim().is_empty() || q.options.len() < 2 {
            return Err(ServerError::bad_request(format!(
                "Question {} needs text and at least two options",
                idx + 1
            )));
        }
        match q.correct_answer {
            Some(answer) if answer >= 0 && (answer as usize) < q.options.len() => {}
            _ => {
                return Err(ServerError::bad_request(format!(
                    "Question {} has an invalid correctAnswer",
                    idx + 1
                )))
            }
        }
    }

    let mut tx = state.pool.begin().await.map_err(ServerError::internal)?;

    let sql = format!(
        "INSERT INTO exams (title, description, semester, branch, duration, date, created_by) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {EXAM_COLUMNS}"
    );
    let exam = sqlx::query_as::<_, ExamRow>(&sql)
        .bind(title)
        .bind(payload.description.as_deref().map(str::trim))
        .bind(semester)
        .bind(branch)
        .bind(duration)
        .bind(&date)
        .bind(caller.id())
        .fetch_one(&mut *tx)
        .await
        .map_err(ServerError::internal)?;

    for (idx, q) in payload.questions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO exam_questions (exam_id, position, question, options, correct_answer, points) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(exam.id)
        .bind(idx as i64)
        .bind(q.question.trim())
        .bind(SqlJson(&q.options))
        .bind(q.correct_answer.unwrap_or_default())
        .bind(q.points.unwrap_or(1.0))
        .execute(&mut *tx)
        .await
        .map_err(ServerError::internal)?;
    }

    tx.commit().await.map_err(ServerError::internal)?;
    tracing::info!(exam_id = exam.id, questions = payload.questions.len(), "exam created");

    let questions = load_questions(&state, exam.id)
        .await?
        .into_iter()
        .map(|q| QuestionView::from_row(q, true))
        .collect();

    Ok((StatusCode::CREATED, Json(ExamDetail { exam, questions })))
}

/// Students only see exams for their own department and semester.
pub async fn list_exams(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ExamSummary>>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT e.id, e.title, e.description, e.semester, e.branch, e.duration, e.date, \
         e.is_active, e.created_by, e.created_at, e.updated_at, \
         (SELECT COUNT(*) FROM exam_questions q WHERE q.exam_id = e.id) AS question_count \
         FROM exams e WHERE 1 = 1",
    );
    if caller.is(Role::Student) {
        qb.push(" AND e.branch = ");
        qb.push_bind(caller.user.department.clone().unwrap_or_default());
        qb.push(" AND e.semester = ");
        qb.push_bind(caller.user.semester.unwrap_or_default());
    }
    qb.push(" ORDER BY e.date DESC, e.id DESC");

    let rows = qb
        .build_query_as::<ExamSummaryRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(
        rows.into_iter()
            .map(|r| ExamSummary {
                exam: r.exam,
                question_count: r.question_count,
            })
            .collect(),
    ))
}

pub async fn get_exam(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<ExamDetail>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    let exam = load_exam(&state, id).await?;

    if already_submitted(&state, caller.id(), id).await? {
        return Err(ServerError::bad_request("You have already submitted this exam"));
    }

    let reveal = !caller.is(Role::Student);
    let questions = load_questions(&state, id)
        .await?
        .into_iter()
        .map(|q| QuestionView::from_row(q, reveal))
        .collect();

    Ok(Json(ExamDetail { exam, questions }))
}

pub async fn submit_exam(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<(StatusCode, Json<SubmitExamResponse>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Student])?;
    load_exam(&state, id).await?;

    let key: Vec<(i64, f64)> = load_questions(&state, id)
        .await?
        .iter()
        .map(|q| (q.correct_answer, q.points))
        .collect();
    let (score, max_score) = score_answers(&key, &payload.answers);

    sqlx::query(
        "INSERT INTO exam_results (student_id, exam_id, answers, score, max_score) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(caller.id())
    .bind(id)
    .bind(SqlJson(&payload.answers))
    .bind(score)
    .bind(max_score)
    .execute(&state.pool)
    .await
    .map_err(|e| map_db_error(e, "You have already submitted this exam"))?;

    tracing::info!(exam_id = id, student = caller.id(), score, max_score, "exam submitted");

    Ok((
        StatusCode::CREATED,
        Json(SubmitExamResponse {
            message: "Exam submitted successfully".to_string(),
            score,
            max_score,
        }),
    ))
}

pub async fn invite_students(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;
    let exam = load_exam(&state, id).await?;

    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = 'student' AND department = ?1 AND semester = ?2"
    );
    let students = sqlx::query_as::<_, UserRow>(&sql)
        .bind(&exam.branch)
        .bind(exam.semester)
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    for student in &students {
        state
            .notifier
            .send_exam_link(student, &exam.title, exam.id)
            .await;
    }

    Ok(Json(MessageResponse::new(format!(
        "Invitations sent to {} students",
        students.len()
    ))))
}

async fn load_exam(state: &AppState, id: i64) -> Result<ExamRow, ServerError> {
    let sql = format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = ?1");
    sqlx::query_as::<_, ExamRow>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::not_found("Exam not found"))
}

async fn load_questions(state: &AppState, exam_id: i64) -> Result<Vec<QuestionRow>, ServerError> {
    sqlx::query_as::<_, QuestionRow>(
        "SELECT id, position, question, options, correct_answer, points FROM exam_questions \
         WHERE exam_id = ?1 ORDER BY position",
    )
    .bind(exam_id)
    .fetch_all(&state.pool)
    .await
    .map_err(ServerError::internal)
}

async fn already_submitted(state: &AppState, student_id: i64, exam_id: i64) -> Result<bool, ServerError> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM exam_results WHERE student_id = ?1 AND exam_id = ?2")
            .bind(student_id)
            .bind(exam_id)
            .fetch_optional(&state.pool)
            .await
            .map_err(ServerError::internal)?;
    Ok(found.is_some())
}
