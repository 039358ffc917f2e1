use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::Profile;
use crate::AppState;

/// GET /profile/me — the caller's own profile.
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Profile>, AppError> {
    let user = state
        .db
        .get_user(caller.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user.into()))
}
