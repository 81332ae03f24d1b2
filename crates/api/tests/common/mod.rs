//! Shared test harness: builds the full application router against a
//! sqlx-provisioned database and provides request/response helpers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use canteiro_api::auth::jwt::JwtConfig;
use canteiro_api::config::{ServerConfig, StorageBackend};
use canteiro_api::pairing::PairingStore;
use canteiro_api::router::build_app_router;
use canteiro_api::state::AppState;
use canteiro_api::ws::WsManager;
use canteiro_billing::{BillingConfig, WebhookProcessor};
use canteiro_events::EventBus;
use canteiro_storage::LocalStorage;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Webhook secret used by billing tests to sign synthetic events.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_integration_test";

/// Stripe price ids wired into the test config.
pub const TEST_PRICE_PRO: &str = "price_test_pro";
pub const TEST_PRICE_BUSINESS: &str = "price_test_business";

/// Build a test `ServerConfig` with safe defaults and billing enabled.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        billing: Some(BillingConfig {
            webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
            api_key: None,
            price_pro: Some(TEST_PRICE_PRO.to_string()),
            price_business: Some(TEST_PRICE_BUSINESS.to_string()),
        }),
        email: None,
        storage: StorageBackend::Local(
            std::env::temp_dir()
                .join("canteiro-test-attachments")
                .to_string_lossy()
                .into_owned(),
        ),
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool. Mirrors the construction in `main.rs` so tests
/// exercise the production middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let event_bus = Arc::new(EventBus::default());

    let billing = config.billing.clone().map(|billing_config| {
        Arc::new(WebhookProcessor::new(
            pool.clone(),
            Arc::clone(&event_bus),
            billing_config,
        ))
    });

    let storage_dir = match &config.storage {
        StorageBackend::Local(dir) => std::path::PathBuf::from(dir),
        StorageBackend::S3(_) => unreachable!("tests use local storage"),
    };

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::new(WsManager::new()),
        pairing: Arc::new(PairingStore::new()),
        event_bus,
        storage: Arc::new(LocalStorage::new(storage_dir)),
        billing,
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Issue a request with an optional bearer token and JSON body.
pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    request(app, Method::GET, uri, token, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> Response<Body> {
    request(app, Method::POST, uri, token, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    request(app, Method::PUT, uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    request(app, Method::DELETE, uri, token, None).await
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

/// Register a user and log in, returning `(access_token, user_id)`.
pub async fn signup(app: &Router, email: &str) -> (String, i64) {
    let response = post(
        app,
        "/api/v1/auth/register",
        None,
        serde_json::json!({
            "email": email,
            "full_name": "Test User",
            "password": "correct-horse-battery",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "register failed");
    let user = body_json(response).await;
    let user_id = user["id"].as_i64().unwrap();

    let response = post(
        app,
        "/api/v1/auth/login",
        None,
        serde_json::json!({
            "email": email,
            "password": "correct-horse-battery",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login failed");
    let auth = body_json(response).await;

    (auth["access_token"].as_str().unwrap().to_string(), user_id)
}

/// Create a company as `token`'s user, returning its id.
pub async fn create_company(app: &Router, token: &str, name: &str) -> i64 {
    let response = post(
        app,
        "/api/v1/companies",
        Some(token),
        serde_json::json!({ "name": name }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "create company failed");
    body_json(response).await["id"].as_i64().unwrap()
}

/// Create a project in a company, returning its id.
pub async fn create_project(app: &Router, token: &str, company_id: i64, name: &str) -> i64 {
    let response = post(
        app,
        &format!("/api/v1/companies/{company_id}/projects"),
        Some(token),
        serde_json::json!({ "name": name }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "create project failed");
    body_json(response).await["id"].as_i64().unwrap()
}

/// Add an existing user to a company with a role (caller must be admin).
pub async fn add_member(app: &Router, admin_token: &str, company_id: i64, email: &str, role: &str) {
    let response = post(
        app,
        &format!("/api/v1/companies/{company_id}/members"),
        Some(admin_token),
        serde_json::json!({ "email": email, "role": role }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "add member failed");
}
