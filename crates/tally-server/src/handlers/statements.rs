//! Statement upload and browsing handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};
use tracing::info;

use tally_core::{DocumentFormat, ImportOutcome, Statement, StatementImporter, Transaction};

use crate::{AppError, AppState, CurrentUser, SuccessResponse, MAX_UPLOAD_SIZE};

/// POST /api/statements - Upload and import a statement
///
/// Expects multipart form with:
/// - file: CSV, text or PDF statement (required, max 10MB)
/// - format: csv, text or pdf (optional, detected from the file otherwise)
pub async fn upload_statement(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<ImportOutcome>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut format: Option<DocumentFormat> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|f| f.to_string())
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| "statement".to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;

                if bytes.len() > MAX_UPLOAD_SIZE {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} MB",
                        MAX_UPLOAD_SIZE / 1024 / 1024
                    )));
                }

                file = Some((filename, bytes.to_vec()));
            }
            "format" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read format"))?;
                if !value.trim().is_empty() {
                    format = Some(
                        value
                            .parse()
                            .map_err(|e: String| AppError::bad_request(&e))?,
                    );
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| AppError::bad_request("Missing file field"))?;
    if bytes.is_empty() {
        return Err(AppError::bad_request("Uploaded file is empty"));
    }

    let outcome = StatementImporter::new(&state.db, state.config.import.clone()).import_document(
        &current.user.id,
        &filename,
        &bytes,
        format,
    )?;

    info!(
        user = %current.user.email,
        statement = outcome.statement.id,
        imported = outcome.imported,
        skipped = outcome.skipped.len(),
        "Statement uploaded"
    );

    Ok(Json(outcome))
}

/// GET /api/statements - The caller's statements, newest first
pub async fn list_statements(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Statement>>, AppError> {
    Ok(Json(state.db.list_statements(&current.user.id)?))
}

/// GET /api/statements/:id - One statement with its parsed rows
pub async fn get_statement(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Statement>, AppError> {
    state
        .db
        .get_statement(&current.user.id, id)?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Statement not found"))
}

/// DELETE /api/statements/:id - Remove a statement and its transactions
pub async fn delete_statement(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_statement(&current.user.id, id)? {
        return Err(AppError::not_found("Statement not found"));
    }
    info!(user = %current.user.email, statement = id, "Statement deleted");
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/statements/:id/transactions
pub async fn get_statement_transactions(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    if state.db.get_statement(&current.user.id, id)?.is_none() {
        return Err(AppError::not_found("Statement not found"));
    }
    Ok(Json(state.db.statement_transactions(&current.user.id, id)?))
}
