mod common;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common::{admin, body, faculty, test_state};
use portal_server::db::{seed_academics, AcademicSeed};
use portal_server::handlers::academics;
use serde_json::json;

#[tokio::test]
async fn departments_are_public_to_read_and_admin_to_write() {
    let state = test_state().await;
    let boss = admin(&state).await;
    let lecturer = faculty(&state, "f@campus.local").await;

    let department = json!({ "name": "Computer Science", "code": "CSE", "duration": "4 Years", "hod": "Dr. Rao" });

    let err = academics::create_department(State(state.clone()), lecturer.headers(), Json(body(department.clone())))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let (status, Json(created)) =
        academics::create_department(State(state.clone()), boss.headers(), Json(body(department.clone())))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.students, 0);

    let err = academics::create_department(State(state.clone()), boss.headers(), Json(body(department)))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Department code already exists");

    let Json(updated) = academics::update_department(
        State(state.clone()),
        boss.headers(),
        Path(created.id),
        Json(body(json!({ "students": 240 }))),
    )
    .await
    .unwrap();
    assert_eq!(updated.students, 240);
    assert_eq!(updated.hod, "Dr. Rao");

    let Json(all) = academics::list_departments(State(state.clone())).await.unwrap();
    assert_eq!(all.len(), 1);

    let Json(done) = academics::delete_department(State(state.clone()), boss.headers(), Path(created.id))
        .await
        .unwrap();
    assert_eq!(done.message, "Department removed");
}

#[tokio::test]
async fn subjects_require_credits() {
    let state = test_state().await;
    let boss = admin(&state).await;

    let err = academics::create_subject(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({ "name": "DBMS", "code": "CS501", "semester": "5", "department": "CSE" }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let (_, Json(subject)) = academics::create_subject(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({
            "name": "DBMS", "code": "CS501", "semester": "5", "credits": 4, "department": "CSE"
        }))),
    )
    .await
    .unwrap();
    assert_eq!(subject.credits, 4);

    let err = academics::update_subject(
        State(state.clone()),
        boss.headers(),
        Path(subject.id + 1),
        Json(body(json!({ "credits": 3 }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn timetables_validate_the_day_and_sort_by_weekday() {
    let state = test_state().await;
    let boss = admin(&state).await;

    let err = academics::create_timetable(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({ "className": "CSE-A", "day": "Funday", "slots": [] }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    for day in ["Wednesday", "Monday"] {
        academics::create_timetable(
            State(state.clone()),
            boss.headers(),
            Json(body(json!({ "className": "CSE-A", "day": day, "slots": [" 9:00 DBMS ", "10:00 OS"] }))),
        )
        .await
        .unwrap();
    }

    let Json(all) = academics::list_timetables(State(state.clone())).await.unwrap();
    let days: Vec<&str> = all.iter().map(|t| t.day.as_str()).collect();
    assert_eq!(days, ["Monday", "Wednesday"]);
    assert_eq!(all[0].slots[0], "9:00 DBMS");

    let Json(moved) = academics::update_timetable(
        State(state.clone()),
        boss.headers(),
        Path(all[0].id),
        Json(body(json!({ "day": "Friday" }))),
    )
    .await
    .unwrap();
    assert_eq!(moved.day, "Friday");
    assert_eq!(moved.slots.len(), 2);

    let err = academics::delete_timetable(State(state.clone()), boss.headers(), Path(999))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Timetable not found");
}

#[tokio::test]
async fn stock_catalogue_replaces_existing_rows() {
    let state = test_state().await;
    let boss = admin(&state).await;

    academics::create_department(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({ "name": "Mechanical", "code": "MECH", "duration": "4 Years", "hod": "Dr. Iyer" }))),
    )
    .await
    .unwrap();

    let seeded = seed_academics(&state.pool).await.unwrap();
    assert_eq!(
        seeded,
        AcademicSeed { departments: 4, subjects: 4, timetables: 10 }
    );

    let Json(departments) = academics::list_departments(State(state.clone())).await.unwrap();
    let codes: Vec<_> = departments.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(codes, ["CSE", "ECE", "EEE", "ISE"]);
    assert_eq!(departments[0].students, 240);

    let Json(subjects) = academics::list_subjects(State(state.clone())).await.unwrap();
    assert_eq!(subjects.len(), 4);

    let Json(timetables) = academics::list_timetables(State(state.clone())).await.unwrap();
    assert_eq!(timetables.len(), 10);
    assert_eq!(timetables[0].class_name, "CSE 5A");
    assert_eq!(timetables[0].day, "Monday");
    assert_eq!(timetables[0].slots.len(), 6);

    // Seeding again leaves one copy of everything.
    seed_academics(&state.pool).await.unwrap();
    let Json(departments) = academics::list_departments(State(state.clone())).await.unwrap();
    assert_eq!(departments.len(), 4);
}
