//! Learned pattern handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use tally_core::{keyword_category, Categorization, Categorizer, Category, LearnedPattern};

use crate::{AppError, AppState, CurrentUser, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct AddPatternRequest {
    pub pattern: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct TestPatternQuery {
    pub description: String,
}

/// GET /api/patterns - The caller's learned patterns, most recently taught first
pub async fn list_patterns(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<LearnedPattern>>, AppError> {
    Ok(Json(state.db.list_patterns(&current.user.id)?))
}

/// POST /api/patterns - Teach a pattern (re-teaching updates it)
pub async fn add_pattern(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<AddPatternRequest>,
) -> Result<Json<LearnedPattern>, AppError> {
    let category: Category = req
        .category
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    let pattern = state
        .db
        .upsert_pattern(&current.user.id, &req.pattern, category)?;
    Ok(Json(pattern))
}

/// DELETE /api/patterns/:id
pub async fn delete_pattern(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_pattern(&current.user.id, id)? {
        return Err(AppError::not_found("Pattern not found"));
    }
    info!(user = %current.user.email, pattern = id, "Pattern deleted");
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/patterns/test?description= - Preview how a description would be categorized
///
/// Usage counts are left untouched.
pub async fn test_pattern(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<TestPatternQuery>,
) -> Result<Json<Categorization>, AppError> {
    let categorizer = Categorizer::load(&state.db, &current.user.id)?;
    let mut result = categorizer.preview(Some(params.description.as_str()));

    if result.is_uncategorized() && state.config.import.keyword_defaults {
        if let Some(keyword) = keyword_category(&params.description) {
            result = keyword;
        }
    }

    Ok(Json(result))
}
