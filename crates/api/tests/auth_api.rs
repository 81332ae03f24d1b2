//! Integration tests for registration, login, refresh rotation, lockout,
//! and logout.

mod common;

use axum::http::StatusCode;
use common::{body_json, post, signup};
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn register_login_round_trip(pool: PgPool) {
    let app = common::build_test_app(pool);

    let (token, user_id) = signup(&app, "mestre@obra.com").await;
    assert!(!token.is_empty());
    assert!(user_id > 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_email_is_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);
    signup(&app, "dup@obra.com").await;

    let response = post(
        &app,
        "/api/v1/auth/register",
        None,
        serde_json::json!({
            "email": "dup@obra.com",
            "full_name": "Other",
            "password": "another-password-1",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn weak_password_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post(
        &app,
        "/api/v1/auth/register",
        None,
        serde_json::json!({
            "email": "weak@obra.com",
            "full_name": "Weak",
            "password": "short",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wrong_password_is_unauthorized_with_generic_message(pool: PgPool) {
    let app = common::build_test_app(pool);
    signup(&app, "user@obra.com").await;

    let response = post(
        &app,
        "/api/v1/auth/login",
        None,
        serde_json::json!({ "email": "user@obra.com", "password": "wrong-password-1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown account produces the same message as a bad password.
    let unknown = post(
        &app,
        "/api/v1/auth/login",
        None,
        serde_json::json!({ "email": "ghost@obra.com", "password": "wrong-password-1" }),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

    let a = body_json(response).await;
    let b = body_json(unknown).await;
    assert_eq!(a["error"], b["error"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn five_failures_lock_the_account(pool: PgPool) {
    let app = common::build_test_app(pool);
    signup(&app, "locked@obra.com").await;

    for _ in 0..5 {
        let response = post(
            &app,
            "/api/v1/auth/login",
            None,
            serde_json::json!({ "email": "locked@obra.com", "password": "bad-password-123" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the correct password is rejected while the account is locked.
    let response = post(
        &app,
        "/api/v1/auth/login",
        None,
        serde_json::json!({ "email": "locked@obra.com", "password": "correct-horse-battery" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn refresh_rotates_the_token(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post(
        &app,
        "/api/v1/auth/register",
        None,
        serde_json::json!({
            "email": "rotate@obra.com",
            "full_name": "Rotator",
            "password": "correct-horse-battery",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let login = post(
        &app,
        "/api/v1/auth/login",
        None,
        serde_json::json!({ "email": "rotate@obra.com", "password": "correct-horse-battery" }),
    )
    .await;
    let auth = body_json(login).await;
    let refresh_token = auth["refresh_token"].as_str().unwrap().to_string();

    // First refresh succeeds and issues a different token.
    let refreshed = post(
        &app,
        "/api/v1/auth/refresh",
        None,
        serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(refreshed.status(), StatusCode::OK);
    let new_auth = body_json(refreshed).await;
    assert_ne!(new_auth["refresh_token"], auth["refresh_token"]);

    // The old token was revoked by the rotation.
    let replayed = post(
        &app,
        "/api/v1/auth/refresh",
        None,
        serde_json::json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(replayed.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn logout_revokes_refresh_tokens(pool: PgPool) {
    let app = common::build_test_app(pool);

    signup(&app, "leaver@obra.com").await;
    let login = post(
        &app,
        "/api/v1/auth/login",
        None,
        serde_json::json!({ "email": "leaver@obra.com", "password": "correct-horse-battery" }),
    )
    .await;
    let auth = body_json(login).await;
    let access = auth["access_token"].as_str().unwrap();
    let refresh = auth["refresh_token"].as_str().unwrap();

    let response = post(
        &app,
        "/api/v1/auth/logout",
        Some(access),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let replayed = post(
        &app,
        "/api/v1/auth/refresh",
        None,
        serde_json::json!({ "refresh_token": refresh }),
    )
    .await;
    assert_eq!(replayed.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn protected_route_requires_token(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = common::get(&app, "/api/v1/companies", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = common::get(&app, "/api/v1/companies", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
