//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tally_core::{validate_signup, AuthClient, AuthSession, CredentialVerifier};

use crate::{AppError, AppState, CurrentUser, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    /// How the user was authenticated
    pub auth_method: String,
}

fn verifier(state: &AppState) -> Result<&AuthClient, AppError> {
    state
        .config
        .auth
        .as_ref()
        .ok_or_else(|| AppError::unavailable("Authentication is not configured"))
}

/// POST /api/auth/login - Exchange email and password for an access token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let email = req.email.trim();
    let session = match verifier(&state)?.sign_in(email, &req.password).await {
        Ok(session) => session,
        Err(e) => {
            warn!(user = %email, error = %e, "Rejected login");
            return Err(e.into());
        }
    };

    state
        .db
        .ensure_user(&session.user.id, &session.user.email)?;
    info!(user = %session.user.email, "Signed in");

    Ok(Json(session))
}

/// POST /api/auth/signup - Create an account
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<AuthSession>, AppError> {
    validate_signup(&req.email, &req.password, &req.confirm_password)?;

    let session = verifier(&state)?
        .sign_up(req.email.trim(), &req.password)
        .await?;

    state
        .db
        .ensure_user(&session.user.id, &session.user.email)?;
    info!(user = %session.user.email, "Signed up");

    Ok(Json(session))
}

/// POST /api/auth/logout - Revoke the caller's token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<SuccessResponse>, AppError> {
    if let Some(token) = current.token.as_deref() {
        verifier(&state)?.sign_out(token).await?;
        info!(user = %current.user.email, "Signed out");
    }

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/me - The currently authenticated user
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Json<MeResponse> {
    let auth_method = match (&current.token, &state.config.auth) {
        (Some(_), Some(client)) => client.kind(),
        _ => "none",
    };

    Json(MeResponse {
        id: current.user.id,
        email: current.user.email,
        auth_method: auth_method.to_string(),
    })
}
