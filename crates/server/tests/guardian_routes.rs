mod common;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use common::{admin, faculty, student, test_state};
use portal_core::app::guardian::Guardian;
use portal_core::domain::guardian::{GuardianPolicy, HealthStatus};
use portal_core::infra::sqlite_probe::SqliteProbe;
use portal_core::infra::system_clock::SystemClock;
use portal_server::handlers::{guardian, public};

#[tokio::test]
async fn guardian_routes_are_admin_only() {
    let state = test_state().await;
    let lecturer = faculty(&state, "f@campus.local").await;

    let err = guardian::health(State(state.clone()), lecturer.headers()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    let err = guardian::cleanup(State(state.clone()), lecturer.headers()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_check_reports_a_small_database_as_healthy() {
    let state = test_state().await;
    let boss = admin(&state).await;

    let Json(report) = guardian::health(State(state.clone()), boss.headers()).await.unwrap();
    let database = report.database.expect("stats collected");
    assert!(database.collections.contains_key("users"));
    assert_eq!(database.collections["users"].count, 1);
    assert_eq!(report.prediction.map(|p| p.status), Some(HealthStatus::Healthy));
    assert!(report.cleanup.is_none());
    assert!(!report.survival_mode);

    let Json(snapshot) = guardian::status(State(state.clone()), boss.headers()).await.unwrap();
    assert!(snapshot.last_check.is_some());
    assert_eq!(snapshot.last_status, Some(HealthStatus::Healthy));
}

#[tokio::test]
async fn cleanup_purges_expired_rows() {
    let state = test_state().await;
    let boss = admin(&state).await;
    let pupil = student(&state, "s@campus.local", "1CS001", "CSE-A").await;

    sqlx::query(
        "INSERT INTO announcements (title, content, target_audience, published_by, published_at, is_active) \
         VALUES ('old', 'gone', '[\"all\"]', ?1, '2000-01-01 00:00:00', 0), \
                ('old but live', 'kept', '[\"all\"]', ?1, '2000-01-01 00:00:00', 1)",
    )
    .bind(boss.id)
    .execute(&state.pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO attendance (student_id, student_usn, student_name, class_name, subject, date, status, marked_by) \
         VALUES (?1, '1CS001', 'S', 'CSE-A', 'OS', '2000-01-05', 'present', ?2)",
    )
    .bind(pupil.id)
    .bind(boss.id)
    .execute(&state.pool)
    .await
    .unwrap();

    let Json(done) = guardian::cleanup(State(state.clone()), boss.headers()).await.unwrap();
    assert_eq!(done.message, "Cleanup completed successfully");
    assert_eq!(done.results.announcements_archived, 1);
    assert_eq!(done.results.attendance_archived, 1);
    assert!(done.results.errors.is_empty());

    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM announcements")
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(left, 1);
}

#[tokio::test]
async fn survival_mode_records_its_actions() {
    let state = test_state().await;
    let boss = admin(&state).await;

    let Json(report) = guardian::survival(State(state.clone()), boss.headers()).await.unwrap();
    assert_eq!(report.mode, "SURVIVAL");
    assert!(!report.actions.is_empty());
}

#[tokio::test]
async fn cleanup_invalidates_cached_public_stats() {
    let state = test_state().await;
    let boss = admin(&state).await;
    student(&state, "a@campus.local", "1CS001", "CSE-A").await;

    let Json(first) = public::public_stats(State(state.clone())).await.unwrap();
    assert_eq!(first["students"], 1);

    student(&state, "b@campus.local", "1CS002", "CSE-A").await;
    let Json(cached) = public::public_stats(State(state.clone())).await.unwrap();
    assert_eq!(cached["students"], 1);

    guardian::cleanup(State(state.clone()), boss.headers()).await.unwrap();
    let Json(fresh) = public::public_stats(State(state.clone())).await.unwrap();
    assert_eq!(fresh["students"], 2);
}

#[tokio::test]
async fn automatic_survival_invalidates_cached_public_stats() {
    let mut state = test_state().await;
    state.guardian = Guardian::new(
        GuardianPolicy {
            storage_limit_bytes: 1,
            ..GuardianPolicy::default()
        },
        Arc::new(SqliteProbe::new(state.pool.clone())),
        Arc::new(SystemClock),
    );
    let boss = admin(&state).await;
    student(&state, "a@campus.local", "1CS001", "CSE-A").await;

    let Json(first) = public::public_stats(State(state.clone())).await.unwrap();
    assert_eq!(first["students"], 1);
    student(&state, "b@campus.local", "1CS002", "CSE-A").await;

    let Json(report) = guardian::health(State(state.clone()), boss.headers()).await.unwrap();
    assert_eq!(report.prediction.map(|p| p.status), Some(HealthStatus::Critical));
    assert!(report.survival_mode);

    let Json(fresh) = public::public_stats(State(state.clone())).await.unwrap();
    assert_eq!(fresh["students"], 2);
}
