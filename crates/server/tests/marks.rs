mod common;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::{admin, body, faculty, student, test_state};
use portal_server::handlers::marks;
use serde_json::json;

#[tokio::test]
async fn upload_replaces_marks_for_the_same_exam() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;
    let pupil = student(&state, "a@campus.local", "1CS001", "CSE Sem 5").await;

    for obtained in [30.0, 42.0] {
        let (status, Json(uploaded)) = marks::upload_marks(
            State(state.clone()),
            lecturer.headers(),
            Json(body(json!({
                "class": "CSE Sem 5",
                "subject": "DBMS",
                "examType": "IA1",
                "maxMarks": 50,
                "marksData": [{ "studentUsn": "1CS001", "obtainedMarks": obtained }]
            }))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(uploaded.count, 1);
    }

    let Json(rows) = marks::list_marks(State(state.clone()), pupil.headers(), Query(body(json!({}))))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].obtained_marks, 42.0);
}

#[tokio::test]
async fn marks_outside_the_range_are_rejected() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;
    student(&state, "a@campus.local", "1CS001", "CSE Sem 5").await;

    for obtained in [json!(51), json!(-1), json!(null)] {
        let err = marks::upload_marks(
            State(state.clone()),
            lecturer.headers(),
            Json(body(json!({
                "class": "CSE Sem 5",
                "subject": "DBMS",
                "examType": "IA1",
                "maxMarks": 50,
                "marksData": [{ "studentUsn": "1CS001", "obtainedMarks": obtained }]
            }))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn stats_average_percentages() {
    let state = test_state().await;
    let boss = admin(&state).await;
    student(&state, "a@campus.local", "1CS001", "CSE Sem 5").await;
    student(&state, "b@campus.local", "1CS002", "CSE Sem 5").await;

    marks::upload_marks(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({
            "class": "CSE Sem 5",
            "subject": "OS",
            "examType": "Final",
            "maxMarks": 100,
            "marksData": [
                { "studentUsn": "1CS001", "obtainedMarks": 80 },
                { "studentUsn": "1CS002", "obtainedMarks": 45 }
            ]
        }))),
    )
    .await
    .unwrap();

    let Json(stats) = marks::marks_stats(State(state.clone()), boss.headers()).await.unwrap();
    assert_eq!(stats.total_results, 2);
    assert_eq!(stats.average_percentage, 62.5);
}

#[tokio::test]
async fn publishing_counts_students_with_marks() {
    let state = test_state().await;
    let boss = admin(&state).await;
    student(&state, "a@campus.local", "1CS001", "CSE Sem 5").await;
    student(&state, "b@campus.local", "1CS002", "CSE Sem 5").await;

    marks::upload_marks(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({
            "class": "CSE Sem 5",
            "subject": "OS",
            "examType": "Final",
            "maxMarks": 100,
            "marksData": [{ "studentUsn": "1CS001", "obtainedMarks": 70 }]
        }))),
    )
    .await
    .unwrap();

    let Json(done) = marks::publish_results(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({ "branch": "CSE", "semester": 5 }))),
    )
    .await
    .unwrap();
    assert_eq!(done.message, "Results published. Notifications sent to 1 students.");

    let err = marks::publish_results(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({ "branch": "ECE", "semester": 5 }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}
