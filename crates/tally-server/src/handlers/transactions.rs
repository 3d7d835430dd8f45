//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use tally_core::{correct_transaction, Category, Correction};

use crate::{AppError, AppState, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct CorrectCategoryRequest {
    pub category: String,
    /// Text to learn instead of the full description
    pub pattern: Option<String>,
}

/// PATCH /api/transactions/:id/category - Correct a category and learn from it
pub async fn correct_category(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<CorrectCategoryRequest>,
) -> Result<Json<Correction>, AppError> {
    let category: Category = req
        .category
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    let correction = correct_transaction(
        &state.db,
        &current.user.id,
        id,
        category,
        req.pattern.as_deref(),
    )?;

    Ok(Json(correction))
}
