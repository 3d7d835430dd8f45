//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tally_core::test_utils::MockAuthServer;
use tally_core::{Category, HostedVerifier, MemoryVerifier};
use tower::ServiceExt;

const OWNER_EMAIL: &str = "owner@example.com";
const OTHER_EMAIL: &str = "other@example.com";
const PASSWORD: &str = "secret-pass";
const BOUNDARY: &str = "tally-test-boundary";

const MARCH_CSV: &str = "Date,Description,Amount\n\
    03/01/2026,DAILY ACH DEBIT 123,-250.00\n\
    03/02/2026,CUSTOMER PAYMENT,1800.00\n\
    03/03/2026,DAILY ACH DEBIT 124,-250.00\n\
    03/04/2026,GUSTO PAYROLL,twelve hundred\n\
    03/05/2026,OFFICE SUPPLIES,-80.00\n";

fn import_options() -> ImportOptions {
    ImportOptions {
        keyword_defaults: false,
        reference_year: 2026,
    }
}

fn setup_test_app() -> Router {
    let verifier = MemoryVerifier::new()
        .with_account(OWNER_EMAIL, PASSWORD)
        .with_account(OTHER_EMAIL, PASSWORD);
    let config = ServerConfig {
        auth: Some(AuthClient::Memory(verifier)),
        import: import_options(),
        ..Default::default()
    };
    create_router(Database::in_memory().unwrap(), config)
}

fn setup_no_auth_app() -> Router {
    let config = ServerConfig {
        require_auth: false,
        import: import_options(),
        ..Default::default()
    };
    create_router(Database::in_memory().unwrap(), config)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn upload_request(token: Option<&str>, filename: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = filename,
        c = contents
    );
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/statements")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

async fn login(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "email": email, "password": PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    json["access_token"].as_str().unwrap().to_string()
}

// ========== Auth API Tests ==========

#[tokio::test]
async fn test_categories_are_public() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/categories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let categories = json.as_array().unwrap();
    assert_eq!(categories.len(), Category::ALL.len());
    assert!(categories
        .iter()
        .any(|c| c["name"] == "MCA_DEBT" && c["debt"] == true));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/patterns")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(authed("GET", "/api/statements", "not-a-real-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_bad_password() {
    let app = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "email": OWNER_EMAIL, "password": "wrong-pass" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_login_and_me() {
    let app = setup_test_app();
    let token = login(&app, OWNER_EMAIL).await;

    let response = app.oneshot(authed("GET", "/api/me", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["email"], OWNER_EMAIL);
    assert_eq!(json["auth_method"], "memory");
}

#[tokio::test]
async fn test_signup_validation() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            None,
            serde_json::json!({
                "email": "new@example.com",
                "password": "abcdef",
                "confirm_password": "abcdeg"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["error"], "Passwords do not match");

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            None,
            serde_json::json!({
                "email": "new@example.com",
                "password": "abc",
                "confirm_password": "abc"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signup_then_use_token() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            None,
            serde_json::json!({
                "email": "new@example.com",
                "password": "abcdef",
                "confirm_password": "abcdef"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = get_body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/patterns", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Same email again
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            None,
            serde_json::json!({
                "email": "new@example.com",
                "password": "abcdef",
                "confirm_password": "abcdef"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(get_body_json(response).await["error"], "Email already registered");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = setup_test_app();
    let token = login(&app, OWNER_EMAIL).await;

    let response = app
        .clone()
        .oneshot(authed("POST", "/api/auth/logout", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(authed("GET", "/api/me", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_hosted_provider_login() {
    let server = MockAuthServer::start().await;
    let config = ServerConfig {
        auth: Some(AuthClient::Hosted(HostedVerifier::new(
            &server.url(),
            MockAuthServer::API_KEY,
        ))),
        import: import_options(),
        ..Default::default()
    };
    let app = create_router(Database::in_memory().unwrap(), config);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({
                "email": MockAuthServer::DEMO_EMAIL,
                "password": MockAuthServer::DEMO_PASSWORD
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = get_body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.oneshot(authed("GET", "/api/me", &token)).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["email"], MockAuthServer::DEMO_EMAIL);
    assert_eq!(json["auth_method"], "hosted");
}

#[tokio::test]
async fn test_no_auth_mode_runs_as_local_dev() {
    let app = setup_no_auth_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["id"], LOCAL_DEV_USER);
    assert_eq!(json["auth_method"], "none");
}

#[tokio::test]
async fn test_login_without_provider_is_unavailable() {
    let app = setup_no_auth_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "email": OWNER_EMAIL, "password": PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ========== Pattern API Tests ==========

#[tokio::test]
async fn test_pattern_lifecycle() {
    let app = setup_test_app();
    let token = login(&app, OWNER_EMAIL).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/patterns",
            Some(token.as_str()),
            serde_json::json!({ "pattern": "DAILY ACH", "category": "MCA_DEBT" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = get_body_json(response).await;
    assert_eq!(created["category"], "MCA_DEBT");
    assert_eq!(created["times_used"], 1);
    let id = created["id"].as_i64().unwrap();

    // Re-teaching the same text updates the existing pattern
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/patterns",
            Some(token.as_str()),
            serde_json::json!({ "pattern": "daily ach", "category": "LOAN_PAYMENT" }),
        ))
        .await
        .unwrap();
    let updated = get_body_json(response).await;
    assert_eq!(updated["id"], id);
    assert_eq!(updated["times_used"], 2);

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/patterns", &token))
        .await
        .unwrap();
    let list = get_body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            "/api/patterns/test?description=DAILY%20ACH%20DEBIT%20123",
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let preview = get_body_json(response).await;
    assert_eq!(preview["category"], "LOAN_PAYMENT");
    assert_eq!(preview["source"], "learned");
    assert_eq!(preview["pattern_id"], id);

    // Previewing does not count as a use
    let response = app
        .clone()
        .oneshot(authed("GET", "/api/patterns", &token))
        .await
        .unwrap();
    assert_eq!(get_body_json(response).await[0]["times_used"], 2);

    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/api/patterns/{}", id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed("DELETE", &format!("/api/patterns/{}", id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_pattern_rejects_bad_input() {
    let app = setup_test_app();
    let token = login(&app, OWNER_EMAIL).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/patterns",
            Some(token.as_str()),
            serde_json::json!({ "pattern": "rent", "category": "GROCERIES" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/patterns",
            Some(token.as_str()),
            serde_json::json!({ "pattern": "   ", "category": "RENT" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preview_without_match_is_uncategorized() {
    let app = setup_test_app();
    let token = login(&app, OWNER_EMAIL).await;

    let response = app
        .oneshot(authed(
            "GET",
            "/api/patterns/test?description=SOMETHING%20ELSE",
            &token,
        ))
        .await
        .unwrap();
    let preview = get_body_json(response).await;
    assert_eq!(preview["category"], "UNCATEGORIZED");
    assert_eq!(preview["confidence"], 0.0);
}

// ========== Statement API Tests ==========

#[tokio::test]
async fn test_upload_statement() {
    let app = setup_test_app();
    let token = login(&app, OWNER_EMAIL).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/patterns",
            Some(token.as_str()),
            serde_json::json!({ "pattern": "DAILY ACH", "category": "MCA_DEBT" }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(upload_request(Some(token.as_str()), "march.csv", MARCH_CSV))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outcome = get_body_json(response).await;
    assert_eq!(outcome["imported"], 4);
    assert_eq!(outcome["skipped"].as_array().unwrap().len(), 1);
    assert_eq!(outcome["skipped"][0]["line"], 5);
    assert_eq!(outcome["breakdown"]["learned"], 2);
    assert_eq!(outcome["statement"]["filename"], "march.csv");
    assert_eq!(outcome["statement"]["total_transactions"], 4);
    assert_eq!(outcome["statement"]["statement_month"], "2026-03");
    let statement_id = outcome["statement"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/statements", &token))
        .await
        .unwrap();
    let list = get_body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert!(list[0].get("raw_data").is_none());

    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/api/statements/{}", statement_id),
            &token,
        ))
        .await
        .unwrap();
    let statement = get_body_json(response).await;
    assert_eq!(statement["raw_data"].as_array().unwrap().len(), 4);

    let response = app
        .oneshot(authed(
            "GET",
            &format!("/api/statements/{}/transactions", statement_id),
            &token,
        ))
        .await
        .unwrap();
    let transactions = get_body_json(response).await;
    let transactions = transactions.as_array().unwrap();
    assert_eq!(transactions.len(), 4);
    assert_eq!(transactions[0]["category"], "MCA_DEBT");
    assert_eq!(transactions[0]["date"], "2026-03-01");
}

#[tokio::test]
async fn test_upload_without_valid_rows() {
    let app = setup_test_app();
    let token = login(&app, OWNER_EMAIL).await;

    let response = app
        .clone()
        .oneshot(upload_request(
            Some(token.as_str()),
            "bad.csv",
            "Date,Description,Amount\nnot a date,THING,1.00\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(authed("GET", "/api/statements", &token))
        .await
        .unwrap();
    assert!(get_body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let app = setup_test_app();
    let token = login(&app, OWNER_EMAIL).await;

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"format\"\r\n\r\ncsv\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/statements")
                .header("authorization", format!("Bearer {}", token))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_statements_are_private() {
    let app = setup_test_app();
    let owner = login(&app, OWNER_EMAIL).await;
    let other = login(&app, OTHER_EMAIL).await;

    let response = app
        .clone()
        .oneshot(upload_request(Some(owner.as_str()), "march.csv", MARCH_CSV))
        .await
        .unwrap();
    let statement_id = get_body_json(response).await["statement"]["id"]
        .as_i64()
        .unwrap();

    for (method, uri) in [
        ("GET", format!("/api/statements/{}", statement_id)),
        ("GET", format!("/api/statements/{}/transactions", statement_id)),
        ("DELETE", format!("/api/statements/{}", statement_id)),
    ] {
        let response = app
            .clone()
            .oneshot(authed(method, &uri, &other))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{} {}", method, uri);
    }

    let response = app
        .oneshot(authed("GET", "/api/statements", &other))
        .await
        .unwrap();
    assert!(get_body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_statement() {
    let app = setup_no_auth_app();

    let response = app
        .clone()
        .oneshot(upload_request(None, "march.csv", MARCH_CSV))
        .await
        .unwrap();
    let statement_id = get_body_json(response).await["statement"]["id"]
        .as_i64()
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/statements/{}", statement_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/statements/{}", statement_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Correction API Tests ==========

#[tokio::test]
async fn test_correct_category_teaches_pattern() {
    let app = setup_test_app();
    let token = login(&app, OWNER_EMAIL).await;

    let response = app
        .clone()
        .oneshot(upload_request(Some(token.as_str()), "march.csv", MARCH_CSV))
        .await
        .unwrap();
    let statement_id = get_body_json(response).await["statement"]["id"]
        .as_i64()
        .unwrap();

    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/api/statements/{}/transactions", statement_id),
            &token,
        ))
        .await
        .unwrap();
    let transactions = get_body_json(response).await;
    let first_id = transactions[0]["id"].as_i64().unwrap();
    assert_eq!(transactions[0]["category"], "UNCATEGORIZED");

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/transactions/{}/category", first_id),
            Some(token.as_str()),
            serde_json::json!({ "category": "MCA_DEBT", "pattern": "DAILY ACH" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let correction = get_body_json(response).await;
    assert_eq!(correction["transaction"]["category"], "MCA_DEBT");
    assert_eq!(correction["transaction"]["user_corrected"], true);
    assert_eq!(correction["transaction"]["category_confidence"], 1.0);
    assert_eq!(correction["pattern"]["pattern"], "DAILY ACH");

    let response = app
        .oneshot(authed(
            "GET",
            "/api/patterns/test?description=DAILY%20ACH%20DEBIT%20999",
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(get_body_json(response).await["category"], "MCA_DEBT");
}

#[tokio::test]
async fn test_correct_category_errors() {
    let app = setup_test_app();
    let owner = login(&app, OWNER_EMAIL).await;
    let other = login(&app, OTHER_EMAIL).await;

    let response = app
        .clone()
        .oneshot(upload_request(Some(owner.as_str()), "march.csv", MARCH_CSV))
        .await
        .unwrap();
    let statement_id = get_body_json(response).await["statement"]["id"]
        .as_i64()
        .unwrap();
    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/api/statements/{}/transactions", statement_id),
            &owner,
        ))
        .await
        .unwrap();
    let txn_id = get_body_json(response).await[0]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/transactions/{}/category", txn_id),
            Some(owner.as_str()),
            serde_json::json!({ "category": "NOT_A_CATEGORY" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/transactions/{}/category", txn_id),
            Some(other.as_str()),
            serde_json::json!({ "category": "RENT" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request(
            "PATCH",
            "/api/transactions/99999/category",
            Some(owner.as_str()),
            serde_json::json!({ "category": "RENT" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Error Mapping Tests ==========

#[test]
fn test_core_errors_map_to_status_codes() {
    use tally_core::Error;

    let cases = [
        (Error::Auth("nope".into()), StatusCode::UNAUTHORIZED),
        (Error::NotFound("Transaction 1".into()), StatusCode::NOT_FOUND),
        (Error::InvalidData("bad".into()), StatusCode::BAD_REQUEST),
        (Error::Import("empty".into()), StatusCode::UNPROCESSABLE_ENTITY),
        (Error::Pdf("broken".into()), StatusCode::UNPROCESSABLE_ENTITY),
        (Error::Config("missing".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (Error::Encryption("bad key".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (err, status) in cases {
        assert_eq!(AppError::from(err).into_response().status(), status);
    }
}

#[tokio::test]
async fn test_internal_errors_are_sanitized() {
    let response =
        AppError::from(tally_core::Error::Config("secret detail".into())).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "An internal error occurred");
}
