//! Authentication handlers

use axum::{extract::State, Json};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use sqlx::PgPool;

use crate::{AppState, AppError, AppResult};
use crate::middleware::auth::{generate_jwt, UserContext};
use crate::models::{CreateUser, LoginRequest, LoginResponse, Role, User, UserInfo};

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    // Find user by username
    let user = User::find_by_username(&state.pool, req.username.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    verify_password(&req.password, &user.password_hash)?;

    // Update last login
    User::update_last_login(&state.pool, user.id).await?;

    // Generate JWT
    let token = generate_jwt(&user, &state.config.jwt_secret, state.config.jwt_expiration_hours)?;

    tracing::info!("User {} logged in as {}", user.username, user.role);

    Ok(Json(LoginResponse {
        token,
        user: user.to_info(),
    }))
}

/// Current user
pub async fn me(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<UserInfo>> {
    let found = User::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(found.to_info()))
}

/// Argon2 hash with a fresh salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::InternalError(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<()> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::InternalError("Invalid password hash".to_string()))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::InvalidCredentials)
}

/// Create the configured academic account if it does not exist yet
pub async fn bootstrap_admin(pool: &PgPool, username: &str, password: &str) -> AppResult<()> {
    if User::exists(pool, username).await? {
        return Ok(());
    }

    let password_hash = hash_password(password)?;
    User::create(
        pool,
        CreateUser {
            username: username.to_string(),
            name: Some("Academic Administrator".to_string()),
            role: Role::Academic,
        },
        password_hash,
    ).await?;

    tracing::info!("Bootstrap academic account created: {}", username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(verify_password("wrong", &hash), Err(AppError::InvalidCredentials)));
    }

    #[test]
    fn test_garbage_hash_is_internal_error() {
        assert!(matches!(verify_password("x", "not-a-hash"), Err(AppError::InternalError(_))));
    }
}
