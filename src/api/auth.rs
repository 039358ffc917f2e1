use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{issue_token, password, AuthUser};
use crate::cache;
use crate::errors::AppError;
use crate::models::user::{Profile, Role};
use crate::store::postgres::NewUser;
use crate::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    /// "employer" or "worker". Defaults to worker.
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub profile: Profile,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

const MIN_PASSWORD_LEN: usize = 8;

/// POST /auth/register — create an account and issue a token.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = payload.email.trim().to_string();
    if !email.contains('@') || email.len() < 3 {
        return Err(AppError::Validation("invalid email address".into()));
    }
    if payload.display_name.trim().is_empty() {
        return Err(AppError::Validation("display_name is required".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let role = match &payload.role {
        Some(r) => Role::parse(r)
            .ok_or_else(|| AppError::Validation(format!("unknown role: {}", r)))?,
        None => Role::Worker,
    };

    let salt = password::generate_salt();
    let hash = password::hash_password(&payload.password, &salt);

    let user = state
        .db
        .create_user(&NewUser {
            email,
            display_name: payload.display_name.trim().to_string(),
            role: role.as_str().to_string(),
            password_hash: hash,
            password_salt: salt,
        })
        .await?;

    let Some(user) = user else {
        return Err(AppError::Conflict("email already registered".into()));
    };

    let token = issue_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_secs)?;
    tracing::info!(user = %user.id, "account registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            profile: user.into(),
        }),
    ))
}

/// Failed attempts at or past the limit block further tries until the
/// window expires.
fn is_throttled(failures: u64, limit: u64) -> bool {
    failures >= limit
}

/// Count a failed attempt and hand back the 401. Counter trouble is logged,
/// not surfaced; the caller still rejects the credentials.
async fn record_login_failure(state: &AppState, key: &str) -> AppError {
    if let Err(e) = state
        .cache
        .increment(key, state.config.login_rate_limit_window)
        .await
    {
        tracing::warn!("failed to record login failure for {}: {}", key, e);
    }
    AppError::Unauthorized
}

/// POST /auth/login — verify credentials and issue a token.
/// Failed attempts are rate-limited per email to slow credential stuffing;
/// a successful login clears the counter.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = payload.email.trim();

    let throttle_key = cache::login_attempts_key(email);
    let failures = state
        .cache
        .counter(&throttle_key)
        .await
        .map_err(AppError::Internal)?;
    if is_throttled(failures, state.config.login_rate_limit) {
        return Err(AppError::RateLimitExceeded);
    }

    let Some(user) = state.db.get_user_by_email(email).await? else {
        return Err(record_login_failure(&state, &throttle_key).await);
    };

    if !user.is_active
        || !password::verify_password(&payload.password, &user.password_salt, &user.password_hash)
    {
        return Err(record_login_failure(&state, &throttle_key).await);
    }

    state.cache.invalidate(&throttle_key).await;
    let token = issue_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_secs)?;

    Ok(Json(AuthResponse {
        token,
        profile: user.into(),
    }))
}

/// POST /auth/change-password — requires the current password.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user = state
        .db
        .get_user(caller.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !password::verify_password(
        &payload.current_password,
        &user.password_salt,
        &user.password_hash,
    ) {
        return Err(AppError::Unauthorized);
    }

    let salt = password::generate_salt();
    let hash = password::hash_password(&payload.new_password, &salt);
    state.db.update_password(user.id, &hash, &salt).await?;
    tracing::info!(user = %user.id, "password changed");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_blocks_at_the_failure_limit() {
        assert!(!is_throttled(0, 10));
        assert!(!is_throttled(9, 10));
        assert!(is_throttled(10, 10));
        assert!(is_throttled(11, 10));
    }
}
