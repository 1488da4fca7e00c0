use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use portal_core::domain::guardian::{
    BloatFinding, CleanupReport, DatabaseStats, ExhaustionPrediction, GuardianSnapshot,
    HealthReport, SurvivalReport,
};
use serde::Serialize;

use crate::app_state::AppState;
use crate::auth::auth_user;
use crate::cache::TtlCache;
use crate::errors::ServerError;

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: String,
    pub results: CleanupReport,
}

pub async fn health(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HealthReport>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;
    let report = state.guardian.run_health_check().await;
    invalidate_after_survival(&state.cache, &report);
    Ok(Json(report))
}

/// Survival mode deletes rows, so cached public counters are dropped.
pub fn invalidate_after_survival(cache: &TtlCache, report: &HealthReport) {
    if report.survival_mode {
        cache.clear();
    }
}

pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DatabaseStats>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;
    let stats = state
        .guardian
        .database_stats()
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(stats))
}

pub async fn bloat(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BloatFinding>>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;
    let findings = state
        .guardian
        .detect_bloat()
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(findings))
}

pub async fn prediction(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ExhaustionPrediction>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;
    let prediction = state
        .guardian
        .predict_exhaustion()
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(prediction))
}

pub async fn cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CleanupResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let results = state.guardian.cleanup_old_data().await;
    tracing::info!(
        by = caller.id(),
        announcements = results.announcements_archived,
        attendance = results.attendance_archived,
        "manual cleanup"
    );
    // Public counters may now be stale.
    state.cache.clear();

    Ok(Json(CleanupResponse {
        message: "Cleanup completed successfully".to_string(),
        results,
    }))
}

pub async fn survival(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SurvivalReport>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;
    tracing::warn!(by = caller.id(), "survival mode requested manually");

    let report = state.guardian.activate_survival_mode().await;
    state.cache.clear();
    Ok(Json(report))
}

pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GuardianSnapshot>, ServerError> {
    auth_user(&state, &headers).await?.require_admin()?;
    Ok(Json(state.guardian.snapshot().await))
}
