mod common;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::{admin, body, faculty, student, test_state};
use portal_server::app_state::AppState;
use portal_server::handlers::materials;
use serde_json::json;

async fn upload(state: &AppState, who: &common::TestUser, title: &str, class_name: &str) -> i64 {
    let (status, Json(created)) = materials::upload_material(
        State(state.clone()),
        who.headers(),
        Json(body(json!({
            "title": title,
            "subject": "DBMS",
            "class": class_name,
            "fileUrl": "https://drive.example.com/file/abc"
        }))),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    created.id
}

#[tokio::test]
async fn inline_uploads_are_refused() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;

    let err = materials::upload_material(
        State(state.clone()),
        lecturer.headers(),
        Json(body(json!({
            "title": "Notes",
            "subject": "DBMS",
            "class": "CSE-A",
            "fileUrl": "data:application/pdf;base64,JVBERi0x"
        }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.message().starts_with("Direct file uploads not allowed"));

    let err = materials::upload_material(
        State(state.clone()),
        lecturer.headers(),
        Json(body(json!({ "title": "Notes", "subject": "DBMS" }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.message(), "Please provide all required fields");
}

#[tokio::test]
async fn defaults_and_uploader_are_filled_in() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;
    let pupil = student(&state, "s@campus.local", "1CS001", "CSE-A").await;
    upload(&state, &lecturer, "Unit 1 Notes", "CSE-A").await;

    let Json(list) = materials::list_materials(State(state.clone()), pupil.headers(), Query(body(json!({}))))
        .await
        .unwrap();
    assert_eq!(list.pagination.total, 1);
    let item = &list.materials[0];
    assert_eq!(item.kind, "LINK");
    assert_eq!(item.size, "Unknown");
    assert_eq!(item.uploaded_by.id, lecturer.id);
    assert_eq!(item.uploaded_by.role.as_deref(), Some("faculty"));
}

#[tokio::test]
async fn search_and_placeholder_filters() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;
    upload(&state, &lecturer, "Unit 1 Notes", "CSE-A").await;
    upload(&state, &lecturer, "Lab Manual", "CSE-B").await;
    upload(&state, &lecturer, "Unit 2 notes", "CSE-B").await;

    let Json(found) = materials::list_materials(
        State(state.clone()),
        lecturer.headers(),
        Query(body(json!({ "search": "NOTES", "class": "All Classes", "subject": "All Subjects" }))),
    )
    .await
    .unwrap();
    assert_eq!(found.pagination.total, 2);

    let Json(b_only) = materials::list_materials(
        State(state.clone()),
        lecturer.headers(),
        Query(body(json!({ "class": "CSE-B", "limit": 1 }))),
    )
    .await
    .unwrap();
    assert_eq!(b_only.materials.len(), 1);
    assert_eq!(b_only.pagination.total, 2);
    assert_eq!(b_only.pagination.pages, 2);
}

#[tokio::test]
async fn only_the_uploader_or_admin_deletes() {
    let state = test_state().await;
    let owner = faculty(&state, "f1@campus.local").await;
    let other = faculty(&state, "f2@campus.local").await;
    let boss = admin(&state).await;
    let first = upload(&state, &owner, "Slides", "CSE-A").await;
    let second = upload(&state, &owner, "More slides", "CSE-A").await;

    let err = materials::delete_material(State(state.clone()), other.headers(), Path(first))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let Json(done) = materials::delete_material(State(state.clone()), owner.headers(), Path(first))
        .await
        .unwrap();
    assert_eq!(done.message, "Material deleted");

    materials::delete_material(State(state.clone()), boss.headers(), Path(second))
        .await
        .unwrap();

    let err = materials::delete_material(State(state.clone()), boss.headers(), Path(second))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}
