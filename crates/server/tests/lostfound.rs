mod common;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::{admin, body, student, test_state};
use portal_server::handlers::lostfound;
use serde_json::{json, Value};

fn report(kind: &str) -> Value {
    json!({
        "type": kind,
        "itemName": "Blue umbrella",
        "category": "Accessories",
        "description": "Folding umbrella with a wooden handle",
        "location": "Library",
        "date": "2025-02-10",
        "contactName": "Asha",
        "contactPhone": "9000000000"
    })
}

#[tokio::test]
async fn reports_are_publicly_listed() {
    let state = test_state().await;
    let pupil = student(&state, "s@campus.local", "1CS001", "CSE-A").await;

    let (status, Json(item)) =
        lostfound::create_item(State(state.clone()), pupil.headers(), Json(body(report("lost"))))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item.status, "active");
    assert_eq!(item.date, "2025-02-10 00:00:00");

    lostfound::create_item(State(state.clone()), pupil.headers(), Json(body(report("found"))))
        .await
        .unwrap();

    let Json(lost) = lostfound::list_items(State(state.clone()), Query(body(json!({ "type": "lost" }))))
        .await
        .unwrap();
    assert_eq!(lost.len(), 1);

    let Json(fetched) = lostfound::get_item(State(state.clone()), Path(item.id)).await.unwrap();
    assert_eq!(fetched.item_name, "Blue umbrella");
}

#[tokio::test]
async fn incomplete_reports_are_rejected() {
    let state = test_state().await;
    let pupil = student(&state, "s@campus.local", "1CS001", "CSE-A").await;

    let mut partial = report("lost");
    partial["location"] = json!("");
    let err = lostfound::create_item(State(state.clone()), pupil.headers(), Json(body(partial)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = lostfound::create_item(State(state.clone()), pupil.headers(), Json(body(report("stolen"))))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reporter_updates_and_admin_removes() {
    let state = test_state().await;
    let reporter = student(&state, "a@campus.local", "1CS001", "CSE-A").await;
    let stranger = student(&state, "b@campus.local", "1CS002", "CSE-A").await;
    let boss = admin(&state).await;

    let (_, Json(item)) =
        lostfound::create_item(State(state.clone()), reporter.headers(), Json(body(report("found"))))
            .await
            .unwrap();

    let err = lostfound::update_item(
        State(state.clone()),
        stranger.headers(),
        Path(item.id),
        Json(body(json!({ "status": "claimed" }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let Json(claimed) = lostfound::update_item(
        State(state.clone()),
        reporter.headers(),
        Path(item.id),
        Json(body(json!({ "status": "claimed" }))),
    )
    .await
    .unwrap();
    assert_eq!(claimed.status, "claimed");
    assert_eq!(claimed.location, "Library");

    let err = lostfound::delete_item(State(state.clone()), reporter.headers(), Path(item.id))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let Json(done) = lostfound::delete_item(State(state.clone()), boss.headers(), Path(item.id))
        .await
        .unwrap();
    assert_eq!(done.message, "Item removed");
}
