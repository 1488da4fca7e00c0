mod common;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use common::{admin, bearer, body, student, test_state, user_with};
use portal_server::auth::{generate_token, hash_password, hash_token};
use portal_server::handlers::auth;
use portal_server::models::users::Role;
use serde_json::json;

#[tokio::test]
async fn login_issues_a_token_that_authenticates() {
    let state = test_state().await;
    let hash = hash_password("secret99").unwrap();
    user_with(&state, "Dana@Campus.Local", Role::Faculty, |u| {
        u.password_hash = hash;
    })
    .await;

    let Json(login) = auth::login(
        State(state.clone()),
        Json(body(json!({
            "email": "  DANA@campus.local ",
            "password": "secret99",
            "role": "faculty"
        }))),
    )
    .await
    .unwrap();

    assert_eq!(login.token_type, "Bearer");
    assert_eq!(login.user.email, "dana@campus.local");

    let Json(me) = auth::me(State(state.clone()), common::bearer(&login.token))
        .await
        .unwrap();
    assert_eq!(me.role, "faculty");
    assert!(me.faculty_data.is_some());
    assert!(me.student_data.is_none());
}

#[tokio::test]
async fn login_with_wrong_role_or_password_is_unauthorized() {
    let state = test_state().await;
    let hash = hash_password("secret99").unwrap();
    user_with(&state, "sam@campus.local", Role::Student, |u| {
        u.password_hash = hash;
    })
    .await;

    for (password, role) in [("secret99", "faculty"), ("wrong", "student"), ("secret99", "dean")] {
        let err = auth::login(
            State(state.clone()),
            Json(body(json!({
                "email": "sam@campus.local",
                "password": password,
                "role": role
            }))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Invalid email, password, or role");
    }
}

#[tokio::test]
async fn missing_or_unknown_token_is_rejected() {
    let state = test_state().await;

    let err = auth::me(State(state.clone()), HeaderMap::new()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.message(), "Not authorized, no token");

    let err = auth::me(State(state.clone()), common::bearer("deadbeef"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let state = test_state().await;
    let user = student(&state, "s1@campus.local", "1CS001", "CSE-A").await;

    auth::logout(State(state.clone()), user.headers()).await.unwrap();
    let err = auth::me(State(state.clone()), user.headers()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_admins_register_users() {
    let state = test_state().await;
    let admin = admin(&state).await;
    let pupil = student(&state, "s1@campus.local", "1CS001", "CSE-A").await;

    let request = json!({
        "name": "New Faculty",
        "email": "nf@campus.local",
        "password": "longenough",
        "role": "faculty",
        "facultyData": { "employeeId": "F42", "department": "ECE" }
    });

    let err = auth::register(State(state.clone()), pupil.headers(), Json(body(request.clone())))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);

    let (status, Json(created)) =
        auth::register(State(state.clone()), admin.headers(), Json(body(request.clone())))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let faculty = created.faculty_data.unwrap();
    assert_eq!(faculty.employee_id.as_deref(), Some("F42"));

    let err = auth::register(State(state.clone()), admin.headers(), Json(body(request)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message(), "User already exists");
}

#[tokio::test]
async fn short_passwords_are_rejected() {
    let state = test_state().await;
    let admin = admin(&state).await;

    let err = auth::register(
        State(state.clone()),
        admin.headers(),
        Json(body(json!({
            "name": "X", "email": "x@campus.local", "password": "12345", "role": "student"
        }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_register_reports_failures_per_row() {
    let state = test_state().await;
    let admin = admin(&state).await;

    let Json(response) = auth::bulk_register(
        State(state.clone()),
        admin.headers(),
        Json(body(json!([
            { "name": "A", "email": "a@campus.local", "role": "student", "usn": "1CS010", "class": "CSE-A" },
            { "name": "B", "email": "b@campus.local", "role": "wizard" },
            { "email": "c@campus.local", "role": "parent" },
            { "name": "A again", "email": "A@campus.local", "role": "student" }
        ]))),
    )
    .await
    .unwrap();

    assert_eq!(response.message, "Processed 4 records");
    assert_eq!(response.results.success, 1);
    assert_eq!(response.results.failed, 3);
    assert_eq!(response.results.errors.len(), 3);

    let Json(students) = auth::list_users(
        State(state.clone()),
        admin.headers(),
        Query(body(json!({ "role": "student" }))),
    )
    .await
    .unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(
        students[0].student_data.as_ref().and_then(|d| d.class_name.as_deref()),
        Some("CSE-A")
    );
}

#[tokio::test]
async fn bulk_rows_without_password_get_the_default() {
    let state = test_state().await;
    let admin = admin(&state).await;

    auth::bulk_register(
        State(state.clone()),
        admin.headers(),
        Json(body(json!([{ "name": "P", "email": "p@campus.local", "role": "parent" }]))),
    )
    .await
    .unwrap();

    let login = auth::login(
        State(state.clone()),
        Json(body(json!({
            "email": "p@campus.local", "password": "welcome123", "role": "parent"
        }))),
    )
    .await;
    assert!(login.is_ok());
}

#[tokio::test]
async fn change_password_checks_the_current_one() {
    let state = test_state().await;
    let hash = hash_password("oldpass1").unwrap();
    let user = user_with(&state, "f@campus.local", Role::Faculty, |u| u.password_hash = hash).await;

    let err = auth::change_password(
        State(state.clone()),
        user.headers(),
        Json(body(json!({ "currentPassword": "nope", "newPassword": "newpass1" }))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.message(), "Current password is incorrect");

    let Json(done) = auth::change_password(
        State(state.clone()),
        user.headers(),
        Json(body(json!({ "currentPassword": "oldpass1", "newPassword": "newpass1" }))),
    )
    .await
    .unwrap();
    assert_eq!(done.message, "Password updated");
}

#[tokio::test]
async fn changing_password_signs_out_other_sessions() {
    let state = test_state().await;
    let hash = hash_password("oldpass1").unwrap();
    let user = user_with(&state, "f@campus.local", Role::Faculty, |u| u.password_hash = hash).await;

    let laptop = generate_token();
    sqlx::query(
        "INSERT INTO user_tokens (user_id, token_hash, expires_at) \
         VALUES (?1, ?2, datetime('now', '+1 hour'))",
    )
    .bind(user.id)
    .bind(hash_token(&laptop))
    .execute(&state.pool)
    .await
    .unwrap();
    auth::me(State(state.clone()), bearer(&laptop)).await.unwrap();

    auth::change_password(
        State(state.clone()),
        user.headers(),
        Json(body(json!({ "currentPassword": "oldpass1", "newPassword": "newpass1" }))),
    )
    .await
    .unwrap();

    let err = auth::me(State(state.clone()), bearer(&laptop)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    let Json(me) = auth::me(State(state.clone()), user.headers()).await.unwrap();
    assert_eq!(me.id, user.id);
}

#[tokio::test]
async fn login_prunes_expired_tokens() {
    let state = test_state().await;
    let hash = hash_password("secret99").unwrap();
    let user = user_with(&state, "dana@campus.local", Role::Faculty, |u| u.password_hash = hash).await;

    sqlx::query(
        "INSERT INTO user_tokens (user_id, token_hash, expires_at) \
         VALUES (?1, ?2, datetime('now', '-1 day'))",
    )
    .bind(user.id)
    .bind(hash_token(&generate_token()))
    .execute(&state.pool)
    .await
    .unwrap();

    auth::login(
        State(state.clone()),
        Json(body(json!({ "email": "dana@campus.local", "password": "secret99", "role": "faculty" }))),
    )
    .await
    .unwrap();

    let expired: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_tokens WHERE expires_at <= datetime('now')")
            .fetch_one(&state.pool)
            .await
            .unwrap();
    assert_eq!(expired, 0);
    let live: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_tokens WHERE user_id = ?1")
        .bind(user.id)
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(live, 2);
}

#[tokio::test]
async fn profile_update_ignores_blank_name() {
    let state = test_state().await;
    let user = student(&state, "s@campus.local", "1CS001", "CSE-A").await;

    let Json(updated) = auth::update_profile(
        State(state.clone()),
        user.headers(),
        Json(body(json!({ "name": "  ", "phone": "9999" }))),
    )
    .await
    .unwrap();
    assert_eq!(updated.name, "s@campus.local");
    assert_eq!(updated.phone.as_deref(), Some("9999"));
}
