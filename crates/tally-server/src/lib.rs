//! Tally Web Server
//!
//! Axum-based REST API for the Tally statement categorizer.
//!
//! Security features:
//! - Bearer tokens verified against the auth provider (secure by default)
//! - Restrictive CORS policy
//! - Upload size limit
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use tally_core::{AuthClient, AuthUser, CredentialVerifier, Database, ImportOptions};

mod handlers;

/// Maximum statement upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// User id every request runs as when authentication is disabled
pub const LOCAL_DEV_USER: &str = "local-dev";

const LOCAL_DEV_EMAIL: &str = "local-dev@localhost";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Credential verifier for login, signup and bearer tokens
    pub auth: Option<AuthClient>,
    /// Options applied to every statement upload
    pub import: ImportOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            auth: None,
            import: ImportOptions::default(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

/// The caller of a protected route, inserted by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthUser,
    /// Bearer token the request carried (absent when auth is disabled)
    pub token: Option<String>,
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Authentication middleware - resolves the bearer token to a user
///
/// The verified user is recorded in the store (so statements and patterns
/// can reference it) and handed to handlers as a [`CurrentUser`] extension.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let current = if !state.config.require_auth {
        CurrentUser {
            user: AuthUser {
                id: LOCAL_DEV_USER.to_string(),
                email: LOCAL_DEV_EMAIL.to_string(),
            },
            token: None,
        }
    } else {
        let Some(auth) = state.config.auth.as_ref() else {
            error!("Authentication required but no auth provider configured");
            return AppError::internal("Authentication is not configured").into_response();
        };

        let Some(token) = bearer_token(&request) else {
            warn!(path = %request.uri().path(), "Unauthorized request - no bearer token");
            return AppError::unauthorized("Authentication required").into_response();
        };

        match auth.verify(&token).await {
            Ok(user) => CurrentUser {
                user,
                token: Some(token),
            },
            Err(e) => {
                warn!(error = %e, path = %request.uri().path(), "Rejected bearer token");
                return AppError::from(e).into_response();
            }
        }
    };

    if let Err(e) = state.db.ensure_user(&current.user.id, &current.user.email) {
        return AppError::from(e).into_response();
    }

    request.extensions_mut().insert(current);
    next.run(request).await
}

/// Standard success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub fn create_router(db: Database, config: ServerConfig) -> Router {
    match &config.auth {
        Some(client) => info!("Auth provider configured: {}", client.kind()),
        None => info!("ℹ️  Auth provider not configured"),
    }

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });

    let public_routes = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/signup", post(handlers::signup))
        .route("/categories", get(handlers::list_categories));

    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/me", get(handlers::get_me))
        .route(
            "/statements",
            get(handlers::list_statements).post(handlers::upload_statement),
        )
        .route(
            "/statements/:id",
            get(handlers::get_statement).delete(handlers::delete_statement),
        )
        .route(
            "/statements/:id/transactions",
            get(handlers::get_statement_transactions),
        )
        .route(
            "/transactions/:id/category",
            patch(handlers::correct_category),
        )
        .route(
            "/patterns",
            get(handlers::list_patterns).post(handlers::add_pattern),
        )
        .route("/patterns/test", get(handlers::test_pattern))
        .route("/patterns/:id", delete(handlers::delete_pattern))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::default()).await
}

pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if config.require_auth && config.auth.is_none() {
        anyhow::bail!(
            "Authentication is enabled but no auth provider is configured \
             (set TALLY_AUTH_URL and TALLY_AUTH_KEY, or use --no-auth)"
        );
    }
    if !config.require_auth {
        warn!(
            "⚠️  Authentication disabled - every request runs as '{}'",
            LOCAL_DEV_USER
        );
    }

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Application error type
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<tally_core::Error> for AppError {
    fn from(err: tally_core::Error) -> Self {
        use tally_core::Error;

        let status = match &err {
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidData(_) => StatusCode::BAD_REQUEST,
            Error::Import(_) | Error::Pdf(_) | Error::Csv(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return Self {
                status,
                message: "An internal error occurred".to_string(),
                internal: Some(err.into()),
            };
        }

        let message = match err {
            Error::Auth(msg) | Error::InvalidData(msg) => msg,
            other => other.to_string(),
        };
        Self {
            status,
            message,
            internal: None,
        }
    }
}

#[cfg(test)]
mod tests;
