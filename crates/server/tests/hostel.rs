mod common;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::{admin, body, student, test_state};
use portal_server::handlers::hostel;
use serde_json::{json, Value};

fn application() -> Value {
    json!({
        "phone": "9876543210",
        "roomPreference": "double",
        "blockPreference": "A",
        "guardianName": "R. Rao",
        "guardianPhone": "9876500000",
        "guardianRelation": "Father"
    })
}

#[tokio::test]
async fn room_status_tracks_occupancy() {
    let state = test_state().await;
    let boss = admin(&state).await;

    let (status, Json(room)) = hostel::create_room(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({
            "blockName": "A", "roomNumber": "101", "floor": 1, "roomType": "double", "capacity": 2
        }))),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(room.status, "available");
    assert_eq!(room.facilities.len(), 4);

    let Json(room) = hostel::update_room(
        State(state.clone()),
        boss.headers(),
        Path(room.id),
        Json(body(json!({
            "occupants": [{ "studentUsn": "1CS001", "studentName": "A" }]
        }))),
    )
    .await
    .unwrap();
    assert_eq!(room.status, "occupied");

    let Json(room) = hostel::update_room(
        State(state.clone()),
        boss.headers(),
        Path(room.id),
        Json(body(json!({
            "occupants": [
                { "studentUsn": "1CS001", "studentName": "A" },
                { "studentUsn": "1CS002", "studentName": "B", "feeStatus": "paid" }
            ]
        }))),
    )
    .await
    .unwrap();
    assert_eq!(room.status, "full");

    let Json(room) = hostel::update_room(
        State(state.clone()),
        boss.headers(),
        Path(room.id),
        Json(body(json!({ "status": "maintenance" }))),
    )
    .await
    .unwrap();
    assert_eq!(room.status, "maintenance");

    let Json(filtered) = hostel::list_rooms(
        State(state.clone()),
        boss.headers(),
        Query(body(json!({ "status": "maintenance", "block": "A" }))),
    )
    .await
    .unwrap();
    assert_eq!(filtered.len(), 1);
}

#[tokio::test]
async fn invalid_rooms_are_rejected() {
    let state = test_state().await;
    let boss = admin(&state).await;

    for request in [
        json!({ "blockName": "A", "roomNumber": "1", "floor": 0, "roomType": "penthouse", "capacity": 2 }),
        json!({ "blockName": "A", "roomNumber": "1", "floor": 0, "roomType": "single", "capacity": 0 }),
        json!({ "blockName": "A", "floor": 0, "roomType": "single", "capacity": 1 }),
    ] {
        let err = hostel::create_room(State(state.clone()), boss.headers(), Json(body(request)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn mess_menu_comes_from_the_first_room_that_has_one() {
    let state = test_state().await;
    let boss = admin(&state).await;

    let Json(empty) = hostel::mess_menu(State(state.clone()), boss.headers()).await.unwrap();
    assert!(empty.is_empty());

    hostel::create_room(
        State(state.clone()),
        boss.headers(),
        Json(body(json!({
            "blockName": "B", "roomNumber": "7", "floor": 0, "roomType": "single", "capacity": 1,
            "messMenu": [{ "day": "Monday", "breakfast": "Idli", "lunch": "Rice", "dinner": "Roti" }]
        }))),
    )
    .await
    .unwrap();

    let Json(menu) = hostel::mess_menu(State(state.clone()), boss.headers()).await.unwrap();
    assert_eq!(menu.len(), 1);
    assert_eq!(menu[0].breakfast, "Idli");
}

#[tokio::test]
async fn one_pending_application_per_student() {
    let state = test_state().await;
    let boss = admin(&state).await;
    let pupil = student(&state, "s@campus.local", "1CS001", "CSE-A").await;

    let (status, Json(submitted)) =
        hostel::submit_application(State(state.clone()), pupil.headers(), Json(body(application())))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(submitted.student_usn, "1CS001");
    assert_eq!(submitted.department, "CSE");
    assert_eq!(submitted.status, "pending");

    let err = hostel::submit_application(State(state.clone()), pupil.headers(), Json(body(application())))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "You already have a pending application");

    let Json(processed) = hostel::process_application(
        State(state.clone()),
        boss.headers(),
        Path(submitted.id),
        Json(body(json!({ "status": "approved", "remarks": "Room A-101" }))),
    )
    .await
    .unwrap();
    assert_eq!(processed.status, "approved");
    assert_eq!(processed.processed_by, Some(boss.id));

    let (_, Json(again)) =
        hostel::submit_application(State(state.clone()), pupil.headers(), Json(body(application())))
            .await
            .unwrap();
    assert_ne!(again.id, submitted.id);

    let Json(latest) = hostel::my_application(State(state.clone()), pupil.headers()).await.unwrap();
    assert_eq!(latest.map(|a| a.id), Some(again.id));

    let Json(pending) = hostel::list_applications(
        State(state.clone()),
        boss.headers(),
        Query(body(json!({ "status": "pending" }))),
    )
    .await
    .unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn applications_are_student_only() {
    let state = test_state().await;
    let boss = admin(&state).await;

    let err = hostel::submit_application(State(state.clone()), boss.headers(), Json(body(application())))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let err = hostel::process_application(
        State(state.clone()),
        boss.headers(),
        Path(77),
        Json(body(json!({ "status": "approved" }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}
