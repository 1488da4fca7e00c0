use argon2::{
    password_hash::{rand_core::OsRng, rand_core::RngCore, SaltString},
    Argon2,
    PasswordHash,
    PasswordHasher,
    PasswordVerifier,
};
use axum::http::{HeaderMap, StatusCode};
use sha2::{Digest, Sha256};

use crate::app_state::AppState;
use crate::errors::ServerError;
use crate::models::users::{Role, UserRow, USER_COLUMNS};

/// The caller behind a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserRow,
    pub role: Role,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn require(&self, allowed: &[Role]) -> Result<(), ServerError> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        Err(ServerError::forbidden(format!(
            "Role '{}' is not authorized for this action",
            self.role
        )))
    }

    pub fn require_admin(&self) -> Result<(), ServerError> {
        self.require(&[Role::Admin])
            .map_err(|_| ServerError::forbidden("Not authorized as an admin"))
    }

    /// Owner of the record, or an admin.
    pub fn require_owner_or_admin(&self, owner_id: i64, what: &str) -> Result<(), ServerError> {
        if self.id() == owner_id || self.is(Role::Admin) {
            return Ok(());
        }
        Err(ServerError::forbidden(format!("Not authorized to {what}")))
    }

    /// Students read their own records and parents read their child's.
    /// `None` means the caller may query any student.
    pub fn forced_usn(&self) -> Option<String> {
        match self.role {
            Role::Student => Some(self.user.usn.clone().unwrap_or_default()),
            Role::Parent => Some(self.user.child_usn.clone().unwrap_or_default()),
            Role::Admin | Role::Faculty => None,
        }
    }
}

pub async fn auth_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ServerError> {
    let token = bearer_token(headers)?;
    let token_hash = hash_token(&token);

    let sql = format!(
        "SELECT {} FROM users WHERE id = (SELECT user_id FROM user_tokens \
         WHERE token_hash = ?1 AND expires_at > datetime('now'))",
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, UserRow>(&sql)
        .bind(&token_hash)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::new(StatusCode::UNAUTHORIZED, "Not authorized, token failed"))?;

    let role = Role::parse(&user.role)
        .ok_or_else(|| ServerError::internal(format!("user {} has unknown role", user.id)))?;

    Ok(AuthUser { user, role })
}

pub fn bearer_token(headers: &HeaderMap) -> Result<String, ServerError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let token = value.strip_prefix("Bearer ").unwrap_or("").trim();
    if token.is_empty() {
        return Err(ServerError::new(
            StatusCode::UNAUTHORIZED,
            "Not authorized, no token",
        ));
    }
    Ok(token.to_string())
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("password hash error: {e}"))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(hash: &str, password: &str) -> Result<(), String> {
    let parsed = PasswordHash::new(hash).map_err(|e| format!("password hash parse error: {e}"))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|e| format!("password verify error: {e}"))
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("welcome123").unwrap();
        assert!(verify_password(&hash, "welcome123").is_ok());
        assert!(verify_password(&hash, "welcome124").is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Token abc".parse().unwrap());
        assert_eq!(
            bearer_token(&headers).unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );
        headers.insert("authorization", "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc");
    }
}
