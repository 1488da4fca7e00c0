use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::{QueryBuilder, Sqlite};

use crate::app_state::AppState;
use crate::auth::{
    auth_user, bearer_token, generate_token, hash_password, hash_token, verify_password,
};
use crate::db::{insert_user, normalize_email, NewUser};
use crate::errors::{is_unique_violation, ServerError};
use crate::models::users::{
    BulkRegisterResponse, BulkResults, BulkRowError, BulkUserRow, LoginRequest, LoginResponse,
    MessageResponse, PasswordChangeRequest, ProfileUpdateRequest, RegisterRequest, Role,
    UserListQuery, UserResponse, UserRow, USER_COLUMNS,
};

const MIN_PASSWORD_LEN: usize = 6;
const INVALID_LOGIN: &str = "Invalid email, password, or role";

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() || payload.role.trim().is_empty() {
        return Err(ServerError::bad_request("Email, password and role are required"));
    }
    let unauthorized = || ServerError::new(StatusCode::UNAUTHORIZED, INVALID_LOGIN);
    let role = Role::parse(&payload.role).ok_or_else(unauthorized)?;

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 AND role = ?2");
    let user = sqlx::query_as::<_, UserRow>(&sql)
        .bind(&email)
        .bind(role.as_str())
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    let Some(user) = user else {
        tracing::info!(email = %email, role = %role, "login failed: no such account");
        return Err(unauthorized());
    };
    if verify_password(&user.password_hash, &payload.password).is_err() {
        tracing::info!(user_id = user.id, "login failed: bad password");
        return Err(unauthorized());
    }

    let pruned = sqlx::query("DELETE FROM user_tokens WHERE expires_at <= datetime('now')")
        .execute(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .rows_affected();
    if pruned > 0 {
        tracing::debug!(pruned, "expired tokens removed");
    }

    let token = generate_token();
    let ttl = format!("+{} seconds", state.token_ttl_seconds);
    sqlx::query(
        "INSERT INTO user_tokens (user_id, token_hash, expires_at) \
         VALUES (?1, ?2, datetime('now', ?3))",
    )
    .bind(user.id)
    .bind(hash_token(&token))
    .bind(&ttl)
    .execute(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    tracing::info!(user_id = user.id, role = %role, "login succeeded");

    Ok(Json(LoginResponse {
        user: user.into(),
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.token_ttl_seconds,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ServerError> {
    auth_user(&state, &headers).await?;
    let token = bearer_token(&headers)?;

    sqlx::query("DELETE FROM user_tokens WHERE token_hash = ?1")
        .bind(hash_token(&token))
        .execute(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(MessageResponse::new("Logged out")))
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let role = Role::parse(&payload.role).ok_or_else(|| ServerError::bad_request("Invalid role"))?;
    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(ServerError::bad_request("Missing required fields"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ServerError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(&payload.password).map_err(ServerError::internal)?;
    let mut user = NewUser::new(&payload.name, &payload.email, password_hash, role);
    user.phone = payload.phone.clone();
    match role {
        Role::Student => {
            let data = payload.student_data.unwrap_or_default();
            user.usn = data.usn;
            user.class_name = data.class_name;
            user.semester = data.semester;
            user.department = data.department;
        }
        Role::Faculty => {
            let data = payload.faculty_data.unwrap_or_default();
            user.employee_id = data.employee_id;
            user.department = data.department;
            user.designation = data.designation;
        }
        Role::Parent => {
            let data = payload.parent_data.unwrap_or_default();
            user.child_usn = data.child_usn;
            user.child_name = data.child_name;
        }
        Role::Admin => {}
    }

    let id = insert_user(&state.pool, &user).await.map_err(|e| {
        if is_unique_violation(&e) {
            ServerError::bad_request("User already exists")
        } else {
            ServerError::internal(e)
        }
    })?;

    tracing::info!(user_id = id, role = %role, by = caller.id(), "user registered");

    let created = load_user(&state, id).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Registers each row independently; failures are reported per row and do
/// not stop the batch.
pub async fn bulk_register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(rows): Json<Vec<BulkUserRow>>,
) -> Result<Json<BulkRegisterResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let mut results = BulkResults::default();
    for row in &rows {
        match register_row(&state, row).await {
            Ok(_) => results.success += 1,
            Err(error) => {
                results.failed += 1;
                results.errors.push(BulkRowError {
                    email: row.email.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        total = rows.len(),
        success = results.success,
        failed = results.failed,
        "bulk registration processed"
    );

    Ok(Json(BulkRegisterResponse {
        message: format!("Processed {} records", rows.len()),
        results,
    }))
}

async fn register_row(state: &AppState, row: &BulkUserRow) -> Result<i64, String> {
    let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    let (Some(name), Some(email), Some(role_raw)) =
        (trimmed(&row.name), trimmed(&row.email), trimmed(&row.role))
    else {
        return Err(format!(
            "Missing required fields for {}",
            row.email.as_deref().unwrap_or("unknown user")
        ));
    };
    let role = Role::parse(&role_raw).ok_or_else(|| format!("Invalid role '{role_raw}'"))?;

    let password = trimmed(&row.password).unwrap_or_else(|| state.default_password.clone());
    let password_hash = hash_password(&password)?;

    let mut user = NewUser::new(&name, &email, password_hash, role);
    user.phone = trimmed(&row.phone);
    match role {
        Role::Student => {
            user.usn = trimmed(&row.usn);
            user.class_name = trimmed(&row.class_name);
            user.semester = row.semester;
            user.department = trimmed(&row.department);
        }
        Role::Faculty => {
            user.employee_id = trimmed(&row.employee_id);
            user.department = trimmed(&row.department);
            user.designation = trimmed(&row.designation);
        }
        Role::Parent => {
            user.child_usn = trimmed(&row.child_usn);
            user.child_name = trimmed(&row.child_name);
        }
        Role::Admin => {}
    }

    insert_user(&state.pool, &user).await.map_err(|e| {
        if is_unique_violation(&e) {
            format!("User {} already exists", user.email)
        } else {
            tracing::error!(error = %e, email = %user.email, "bulk insert failed");
            "Could not create user".to_string()
        }
    })
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    Ok(Json(caller.user.into()))
}

pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"));
    if let Some(raw) = query.role.as_deref().filter(|r| !r.trim().is_empty()) {
        let role = Role::parse(raw).ok_or_else(|| ServerError::bad_request("Invalid role"))?;
        qb.push(" AND role = ");
        qb.push_bind(role.as_str());
    }
    qb.push(" ORDER BY created_at DESC, id DESC");

    let rows = qb
        .build_query_as::<UserRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(rows.into_iter().map(UserResponse::from).collect()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let name = payload.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let phone = payload.phone.as_deref().map(str::trim);

    sqlx::query(
        "UPDATE users SET name = COALESCE(?1, name), phone = COALESCE(?2, phone), \
         updated_at = datetime('now') WHERE id = ?3",
    )
    .bind(name)
    .bind(phone)
    .bind(caller.id())
    .execute(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    Ok(Json(load_user(&state, caller.id()).await?.into()))
}

pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PasswordChangeRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ServerError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if verify_password(&caller.user.password_hash, &payload.current_password).is_err() {
        return Err(ServerError::bad_request("Current password is incorrect"));
    }

    let password_hash = hash_password(&payload.new_password).map_err(ServerError::internal)?;
    let current = hash_token(&bearer_token(&headers)?);

    let mut tx = state.pool.begin().await.map_err(ServerError::internal)?;
    sqlx::query("UPDATE users SET password_hash = ?1, updated_at = datetime('now') WHERE id = ?2")
        .bind(password_hash)
        .bind(caller.id())
        .execute(&mut *tx)
        .await
        .map_err(ServerError::internal)?;
    // Every other session signs in again.
    let revoked = sqlx::query("DELETE FROM user_tokens WHERE user_id = ?1 AND token_hash <> ?2")
        .bind(caller.id())
        .bind(&current)
        .execute(&mut *tx)
        .await
        .map_err(ServerError::internal)?
        .rows_affected();
    tx.commit().await.map_err(ServerError::internal)?;

    tracing::info!(user_id = caller.id(), revoked, "password changed");
    Ok(Json(MessageResponse::new("Password updated")))
}

async fn load_user(state: &AppState, id: i64) -> Result<UserRow, ServerError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::not_found("User not found"))
}
