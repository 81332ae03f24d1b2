//! Integration tests for the Stripe webhook consumer: signature gating,
//! idempotency, status mapping, and the downgrade transaction.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::{body_json, create_company, get, post, signup, TEST_WEBHOOK_SECRET};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::PgPool;
use tower::ServiceExt;

type HmacSha256 = Hmac<Sha256>;

/// Sign `body` the way Stripe does.
fn stripe_signature(body: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(TEST_WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{body}").as_bytes());
    let hex: String = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    format!("t={timestamp},v1={hex}")
}

/// Deliver a webhook event with a valid signature.
async fn deliver(app: &Router, event: &serde_json::Value) -> StatusCode {
    let body = event.to_string();
    let signature = stripe_signature(&body, chrono::Utc::now().timestamp());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/billing/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(body))
        .unwrap();

    app.clone().oneshot(request).await.unwrap().status()
}

fn checkout_completed(event_id: &str, company_id: i64, plan: &str) -> serde_json::Value {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": {
            "client_reference_id": company_id.to_string(),
            "customer": "cus_test_1",
            "subscription": "sub_test_1",
            "metadata": { "plan": plan },
        }}
    })
}

fn subscription_updated(event_id: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": event_id,
        "type": "customer.subscription.updated",
        "data": { "object": {
            "id": "sub_test_1",
            "customer": "cus_test_1",
            "status": status,
            "cancel_at_period_end": false,
            "current_period_end": 1790000000i64,
            "items": { "data": [ { "price": { "id": common::TEST_PRICE_PRO } } ] }
        }}
    })
}

async fn subscription_view(app: &Router, token: &str, company_id: i64) -> serde_json::Value {
    let response = get(
        app,
        &format!("/api/v1/companies/{company_id}/billing/subscription"),
        Some(token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Signature gating
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn unsigned_or_tampered_events_are_rejected_without_writes(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, _) = signup(&app, "billing@alfa.com").await;
    let company = create_company(&app, &token, "Construtora Alfa").await;

    let event = checkout_completed("evt_sig_1", company, "pro");
    let body = event.to_string();

    // Missing header.
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/billing/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.clone()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Tampered body: signature computed over different bytes.
    let signature = stripe_signature(&body, chrono::Utc::now().timestamp());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/billing/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(format!("{body} ")))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Stale timestamp.
    let stale = stripe_signature(&body, chrono::Utc::now().timestamp() - 3600);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/billing/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("stripe-signature", stale)
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No write happened: the company still reads as free.
    let view = subscription_view(&app, &token, company).await;
    assert_eq!(view["plan"], "free");
}

// ---------------------------------------------------------------------------
// Event processing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn checkout_completed_activates_the_plan(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, _) = signup(&app, "billing@alfa.com").await;
    let company = create_company(&app, &token, "Construtora Alfa").await;

    let status = deliver(&app, &checkout_completed("evt_checkout_1", company, "pro")).await;
    assert_eq!(status, StatusCode::OK);

    let view = subscription_view(&app, &token, company).await;
    assert_eq!(view["plan"], "pro");
    assert_eq!(view["status"], "active");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn stripe_statuses_map_to_the_local_enum(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, _) = signup(&app, "billing@alfa.com").await;
    let company = create_company(&app, &token, "Construtora Alfa").await;

    deliver(&app, &checkout_completed("evt_checkout_1", company, "pro")).await;

    for (n, (stripe_status, local)) in [
        ("trialing", "active"),
        ("past_due", "past_due"),
        ("paused", "paused"),
        ("unpaid", "canceled"),
    ]
    .iter()
    .enumerate()
    {
        let event = subscription_updated(&format!("evt_upd_{n}"), stripe_status);
        assert_eq!(deliver(&app, &event).await, StatusCode::OK);

        let view = subscription_view(&app, &token, company).await;
        assert_eq!(view["status"], *local, "stripe status {stripe_status}");
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_event_ids_are_not_reprocessed(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, _) = signup(&app, "billing@alfa.com").await;
    let company = create_company(&app, &token, "Construtora Alfa").await;

    deliver(&app, &checkout_completed("evt_checkout_1", company, "pro")).await;
    deliver(&app, &subscription_updated("evt_dup", "past_due")).await;

    // Same event id, contradictory payload: acknowledged but not applied.
    let replay = subscription_updated("evt_dup", "canceled");
    assert_eq!(deliver(&app, &replay).await, StatusCode::OK);

    let view = subscription_view(&app, &token, company).await;
    assert_eq!(view["status"], "past_due");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn payment_failure_marks_past_due(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, _) = signup(&app, "billing@alfa.com").await;
    let company = create_company(&app, &token, "Construtora Alfa").await;

    deliver(&app, &checkout_completed("evt_checkout_1", company, "pro")).await;

    let event = serde_json::json!({
        "id": "evt_invoice_1",
        "type": "invoice.payment_failed",
        "data": { "object": { "customer": "cus_test_1", "attempt_count": 2 } }
    });
    assert_eq!(deliver(&app, &event).await, StatusCode::OK);

    let view = subscription_view(&app, &token, company).await;
    assert_eq!(view["status"], "past_due");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_event_types_are_acknowledged(pool: PgPool) {
    let app = common::build_test_app(pool);

    let event = serde_json::json!({
        "id": "evt_other",
        "type": "customer.tax_id.created",
        "data": { "object": {} }
    });
    assert_eq!(deliver(&app, &event).await, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Downgrade transaction
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn subscription_deletion_downgrades_archives_and_rekeys_usage(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, _) = signup(&app, "billing@alfa.com").await;
    let company = create_company(&app, &token, "Construtora Alfa").await;

    deliver(&app, &checkout_completed("evt_checkout_1", company, "pro")).await;

    // Three active surveys, allowed on pro (free allows two).
    let mut survey_ids = Vec::new();
    for n in 1..=3 {
        let response = post(
            &app,
            &format!("/api/v1/companies/{company}/surveys"),
            Some(&token),
            serde_json::json!({
                "title": format!("Pesquisa {n}"),
                "questions": [ { "text": "Nota geral?", "kind": "rating" } ],
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["id"].as_i64().unwrap();
        let response = post(
            &app,
            &format!("/api/v1/companies/{company}/surveys/{id}/activate"),
            Some(&token),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        survey_ids.push(id);
    }

    let event = serde_json::json!({
        "id": "evt_deleted_1",
        "type": "customer.subscription.deleted",
        "data": { "object": {
            "id": "sub_test_1",
            "customer": "cus_test_1",
            "status": "canceled",
        }}
    });
    assert_eq!(deliver(&app, &event).await, StatusCode::OK);

    // Subscription: canceled, free.
    let view = subscription_view(&app, &token, company).await;
    assert_eq!(view["plan"], "free");
    assert_eq!(view["status"], "canceled");

    // Surveys: the two most recent stay active, the oldest is archived.
    let response = get(
        &app,
        &format!("/api/v1/companies/{company}/surveys"),
        Some(&token),
    )
    .await;
    let surveys = body_json(response).await;
    let active: Vec<i64> = surveys
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["status"] == "active")
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    assert_eq!(active.len(), 2);
    assert!(!active.contains(&survey_ids[0]), "oldest survey must be archived");

    // Usage: the open period is keyed to the free plan.
    let response = get(
        &app,
        &format!("/api/v1/companies/{company}/billing/usage"),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let usage = body_json(response).await;
    assert_eq!(usage["plan"], "free");
    assert_eq!(usage["active_surveys_count"], 2);
}
