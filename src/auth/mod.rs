//! Bearer-token authentication: JWT issue/verify plus the axum middleware
//! that gates every non-auth route.

pub mod password;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Role, UserRow};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub name: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Verified identity injected into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

pub fn issue_token(user: &UserRow, secret: &str, ttl_secs: u64) -> anyhow::Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        name: user.display_name.clone(),
        role: user.role.clone(),
        iat: now,
        exp: now + ttl_secs as i64,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("token verification failed: {}", e);
        AppError::Unauthorized
    })
}

/// Middleware: validates the `Authorization: Bearer <jwt>` header and
/// injects an `AuthUser` extension for handlers. 401 on anything invalid.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(token, &state.config.jwt_secret)?;
    let role = Role::parse(&claims.role).ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        name: claims.name,
        role,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            email: "w@example.com".into(),
            display_name: "Worker".into(),
            role: "worker".into(),
            password_hash: String::new(),
            password_salt: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let u = user();
        let token = issue_token(&u, "test-secret", 3600).unwrap();
        let claims = verify_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.name, "Worker");
        assert_eq!(claims.role, "worker");
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_token(&user(), "secret-a", 3600).unwrap();
        assert!(verify_token(&token, "secret-b").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let u = user();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: u.id,
            name: u.display_name.clone(),
            role: u.role.clone(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(verify_token(&token, "test-secret").is_err());
    }
}
