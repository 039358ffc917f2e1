use std::sync::Arc;

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::models::category::Category;
use crate::AppState;

/// GET /categories — the category lookup table, alphabetical.
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = state.db.list_categories().await?;
    Ok(Json(categories))
}
