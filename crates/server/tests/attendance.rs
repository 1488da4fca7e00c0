mod common;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::{admin, body, faculty, student, test_state, user_with};
use portal_server::handlers::attendance;
use portal_server::models::users::Role;
use serde_json::json;

#[tokio::test]
async fn marking_twice_overwrites_the_day() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;
    student(&state, "a@campus.local", "1CS001", "CSE-A").await;

    let mark = |status: &'static str| {
        json!({
            "class": "CSE-A",
            "subject": "DBMS",
            "date": "2025-03-03",
            "attendanceData": [{ "studentUsn": "1CS001", "status": status }]
        })
    };

    let (status, Json(first)) =
        attendance::mark_attendance(State(state.clone()), lecturer.headers(), Json(body(mark("absent"))))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first.count, 1);

    let (_, Json(second)) =
        attendance::mark_attendance(State(state.clone()), lecturer.headers(), Json(body(mark("present"))))
            .await
            .unwrap();
    assert_eq!(second.records[0].id, first.records[0].id);
    assert_eq!(second.records[0].status, "present");

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn unknown_students_are_skipped_and_bad_status_rejected() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;
    student(&state, "a@campus.local", "1CS001", "CSE-A").await;

    let (_, Json(marked)) = attendance::mark_attendance(
        State(state.clone()),
        lecturer.headers(),
        Json(body(json!({
            "class": "CSE-A",
            "subject": "DBMS",
            "date": "2025-03-03",
            "attendanceData": [
                { "studentUsn": "1CS001", "status": "late" },
                { "studentUsn": "NOPE", "status": "present" }
            ]
        }))),
    )
    .await
    .unwrap();
    assert_eq!(marked.count, 1);

    let err = attendance::mark_attendance(
        State(state.clone()),
        lecturer.headers(),
        Json(body(json!({
            "class": "CSE-A",
            "subject": "DBMS",
            "date": "2025-03-04",
            "attendanceData": [{ "studentUsn": "1CS001", "status": "asleep" }]
        }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn students_only_see_their_own_records() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;
    let alice = student(&state, "a@campus.local", "1CS001", "CSE-A").await;
    student(&state, "b@campus.local", "1CS002", "CSE-A").await;

    for (date, a, b) in [
        ("2025-03-03", "present", "absent"),
        ("2025-03-04", "absent", "present"),
        ("2025-03-05", "present", "present"),
    ] {
        attendance::mark_attendance(
            State(state.clone()),
            lecturer.headers(),
            Json(body(json!({
                "class": "CSE-A",
                "subject": "DBMS",
                "date": date,
                "attendanceData": [
                    { "studentUsn": "1CS001", "status": a },
                    { "studentUsn": "1CS002", "status": b }
                ]
            }))),
        )
        .await
        .unwrap();
    }

    let Json(list) = attendance::list_attendance(
        State(state.clone()),
        alice.headers(),
        Query(body(json!({ "studentUsn": "1CS002" }))),
    )
    .await
    .unwrap();
    assert_eq!(list.pagination.total, 3);
    assert!(list.records.iter().all(|r| r.student_usn == "1CS001"));

    let Json(report) = attendance::attendance_report(
        State(state.clone()),
        alice.headers(),
        Query(body(json!({}))),
    )
    .await
    .unwrap();
    assert_eq!(report.stats.total, 3);
    assert_eq!(report.stats.present, 2);
    assert_eq!(report.stats.percentage, 66.67);

    let Json(window) = attendance::attendance_report(
        State(state.clone()),
        lecturer.headers(),
        Query(body(json!({ "class": "CSE-A", "startDate": "2025-03-04", "endDate": "2025-03-04" }))),
    )
    .await
    .unwrap();
    assert_eq!(window.stats.total, 2);
}

#[tokio::test]
async fn parents_follow_their_child() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;
    student(&state, "a@campus.local", "1CS001", "CSE-A").await;
    student(&state, "b@campus.local", "1CS002", "CSE-A").await;
    let parent = user_with(&state, "p@campus.local", Role::Parent, |u| {
        u.child_usn = Some("1CS002".into());
    })
    .await;

    attendance::mark_attendance(
        State(state.clone()),
        lecturer.headers(),
        Json(body(json!({
            "class": "CSE-A",
            "subject": "OS",
            "date": "2025-03-03",
            "attendanceData": [
                { "studentUsn": "1CS001", "status": "present" },
                { "studentUsn": "1CS002", "status": "absent" }
            ]
        }))),
    )
    .await
    .unwrap();

    let Json(list) =
        attendance::list_attendance(State(state.clone()), parent.headers(), Query(body(json!({}))))
            .await
            .unwrap();
    assert_eq!(list.records.len(), 1);
    assert_eq!(list.records[0].student_usn, "1CS002");
}

#[tokio::test]
async fn class_roster_requires_a_class() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;
    student(&state, "a@campus.local", "1CS001", "CSE-A").await;
    student(&state, "b@campus.local", "1CS002", "CSE-B").await;

    let err = attendance::class_students(State(state.clone()), lecturer.headers(), Query(body(json!({}))))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Class is required");

    let Json(roster) = attendance::class_students(
        State(state.clone()),
        lecturer.headers(),
        Query(body(json!({ "class": "CSE-B" }))),
    )
    .await
    .unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].usn.as_deref(), Some("1CS002"));

    let Json(classes) = attendance::list_classes(State(state.clone()), lecturer.headers())
        .await
        .unwrap();
    assert_eq!(classes, vec!["CSE-A".to_string(), "CSE-B".to_string()]);
}

#[tokio::test]
async fn overall_stats_are_admin_only() {
    let state = test_state().await;
    let boss = admin(&state).await;
    let lecturer = faculty(&state, "f@campus.local").await;
    student(&state, "a@campus.local", "1CS001", "CSE-A").await;
    student(&state, "b@campus.local", "1CS002", "CSE-A").await;
    student(&state, "c@campus.local", "1CS003", "CSE-A").await;

    attendance::mark_attendance(
        State(state.clone()),
        lecturer.headers(),
        Json(body(json!({
            "class": "CSE-A",
            "subject": "OS",
            "date": "2025-03-03",
            "attendanceData": [
                { "studentUsn": "1CS001", "status": "present" },
                { "studentUsn": "1CS002", "status": "present" },
                { "studentUsn": "1CS003", "status": "absent" }
            ]
        }))),
    )
    .await
    .unwrap();

    let err = attendance::attendance_stats(State(state.clone()), lecturer.headers())
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let Json(stats) = attendance::attendance_stats(State(state.clone()), boss.headers())
        .await
        .unwrap();
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.present_records, 2);
    assert_eq!(stats.percentage, 66.7);
}
