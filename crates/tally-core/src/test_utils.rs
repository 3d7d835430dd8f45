//! Test utilities for tally-core
//!
//! This module provides a mock auth provider speaking the Supabase-style
//! `/auth/v1` REST API, for development and integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

#[derive(Default)]
struct MockState {
    /// email -> (user id, password)
    accounts: HashMap<String, (String, String)>,
    /// token -> (user id, email)
    sessions: HashMap<String, (String, String)>,
    next_id: u64,
}

type Shared = Arc<Mutex<MockState>>;

/// Mock auth provider for testing and development
pub struct MockAuthServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockAuthServer {
    /// The `apikey` header value the mock accepts
    pub const API_KEY: &'static str = "test-anon-key";
    /// Account present from the start
    pub const DEMO_EMAIL: &'static str = "demo@example.com";
    pub const DEMO_PASSWORD: &'static str = "demo-password";

    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let mut state = MockState::default();
        state.next_id = 1;
        state.accounts.insert(
            Self::DEMO_EMAIL.to_string(),
            ("user-demo".to_string(), Self::DEMO_PASSWORD.to_string()),
        );
        let state: Shared = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/auth/v1/token", post(handle_token))
            .route("/auth/v1/signup", post(handle_signup))
            .route("/auth/v1/user", get(handle_user))
            .route("/auth/v1/logout", post(handle_logout))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockAuthServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Deserialize)]
struct CredentialsBody {
    email: String,
    password: String,
}

fn api_key_ok(headers: &HeaderMap) -> bool {
    headers
        .get("apikey")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == MockAuthServer::API_KEY)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn invalid_api_key() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid API key" })),
    )
        .into_response()
}

fn session_body(token: &str, id: &str, email: &str) -> Response {
    Json(json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 3600,
        "user": { "id": id, "email": email }
    }))
    .into_response()
}

fn issue(state: &mut MockState, id: &str, email: &str) -> String {
    let token = format!("token-{}-{}", id, state.next_id);
    state.next_id += 1;
    state
        .sessions
        .insert(token.clone(), (id.to_string(), email.to_string()));
    token
}

/// Password grant
async fn handle_token(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CredentialsBody>,
) -> Response {
    if !api_key_ok(&headers) {
        return invalid_api_key();
    }

    let mut state = state.lock().unwrap();
    let account = state.accounts.get(&body.email.to_lowercase()).cloned();
    match account {
        Some((id, password)) if password == body.password => {
            let token = issue(&mut state, &id, &body.email);
            session_body(&token, &id, &body.email)
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })),
        )
            .into_response(),
    }
}

async fn handle_signup(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CredentialsBody>,
) -> Response {
    if !api_key_ok(&headers) {
        return invalid_api_key();
    }

    let mut state = state.lock().unwrap();
    let key = body.email.to_lowercase();
    if state.accounts.contains_key(&key) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "code": 422, "msg": "User already registered" })),
        )
            .into_response();
    }

    let id = format!("user-{}", state.next_id);
    state.next_id += 1;
    state.accounts.insert(key, (id.clone(), body.password));
    let token = issue(&mut state, &id, &body.email);
    session_body(&token, &id, &body.email)
}

async fn handle_user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !api_key_ok(&headers) {
        return invalid_api_key();
    }

    let state = state.lock().unwrap();
    match bearer(&headers).and_then(|t| state.sessions.get(&t).cloned()) {
        Some((id, email)) => Json(json!({ "id": id, "email": email })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid JWT: unable to parse or verify signature" })),
        )
            .into_response(),
    }
}

async fn handle_logout(State(state): State<Shared>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer(&headers) {
        state.lock().unwrap().sessions.remove(&token);
    }
    StatusCode::NO_CONTENT
}
