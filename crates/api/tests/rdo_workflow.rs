//! Integration tests for the daily report (RDO) workflow: one report per
//! date, submit/approve/reject transitions, and role gating.

mod common;

use axum::http::StatusCode;
use common::{add_member, body_json, create_company, create_project, delete, get, post, put, signup};
use sqlx::PgPool;

async fn setup(app: &axum::Router) -> (String, String, i64, i64) {
    let (manager, _) = signup(app, "manager@alfa.com").await;
    let (worker, _) = signup(app, "worker@alfa.com").await;

    let company = create_company(app, &manager, "Construtora Alfa").await;
    add_member(app, &manager, company, "worker@alfa.com", "member").await;
    let project = create_project(app, &manager, company, "Residencial Norte").await;

    (manager, worker, company, project)
}

fn rdo_uri(company: i64, project: i64) -> String {
    format!("/api/v1/companies/{company}/projects/{project}/rdos")
}

#[sqlx::test(migrations = "../db/migrations")]
async fn one_report_per_project_per_date(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, worker, company, project) = setup(&app).await;

    let body = serde_json::json!({
        "report_date": "2026-03-02",
        "weather_morning": "clear",
        "workforce_count": 12,
        "activities": "Concretagem da laje do 3o pavimento",
    });

    let response = post(&app, &rdo_uri(company, project), Some(&worker), body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Same project + same date -> 409 from the unique constraint.
    let response = post(&app, &rdo_uri(company, project), Some(&worker), body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_then_approve_happy_path(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (manager, worker, company, project) = setup(&app).await;

    let response = post(
        &app,
        &rdo_uri(company, project),
        Some(&worker),
        serde_json::json!({ "report_date": "2026-03-02", "workforce_count": 8 }),
    )
    .await;
    let rdo = body_json(response).await;
    let rdo_id = rdo["id"].as_i64().unwrap();
    assert_eq!(rdo["status"], "draft");

    let uri = format!("{}/{rdo_id}/submit", rdo_uri(company, project));
    let response = post(&app, &uri, Some(&worker), serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "submitted");

    let uri = format!("{}/{rdo_id}/approve", rdo_uri(company, project));
    let response = post(
        &app,
        &uri,
        Some(&manager),
        serde_json::json!({ "note": "Tudo em ordem" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let approved = body_json(response).await;
    assert_eq!(approved["status"], "approved");
    assert!(approved["approved_by"].is_i64());
    assert!(approved["decided_at"].is_string());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn member_cannot_approve(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, worker, company, project) = setup(&app).await;

    let response = post(
        &app,
        &rdo_uri(company, project),
        Some(&worker),
        serde_json::json!({ "report_date": "2026-03-02" }),
    )
    .await;
    let rdo_id = body_json(response).await["id"].as_i64().unwrap();

    let uri = format!("{}/{rdo_id}/submit", rdo_uri(company, project));
    post(&app, &uri, Some(&worker), serde_json::json!({})).await;

    let uri = format!("{}/{rdo_id}/approve", rdo_uri(company, project));
    let response = post(&app, &uri, Some(&worker), serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn approving_a_draft_is_a_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (manager, worker, company, project) = setup(&app).await;

    let response = post(
        &app,
        &rdo_uri(company, project),
        Some(&worker),
        serde_json::json!({ "report_date": "2026-03-02" }),
    )
    .await;
    let rdo_id = body_json(response).await["id"].as_i64().unwrap();

    // Never submitted: approval must not succeed.
    let uri = format!("{}/{rdo_id}/approve", rdo_uri(company, project));
    let response = post(&app, &uri, Some(&manager), serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reject_requires_note_and_editing_returns_to_draft(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (manager, worker, company, project) = setup(&app).await;

    let response = post(
        &app,
        &rdo_uri(company, project),
        Some(&worker),
        serde_json::json!({ "report_date": "2026-03-02", "workforce_count": 5 }),
    )
    .await;
    let rdo_id = body_json(response).await["id"].as_i64().unwrap();

    let uri = format!("{}/{rdo_id}/submit", rdo_uri(company, project));
    post(&app, &uri, Some(&worker), serde_json::json!({})).await;

    // Rejection without a note is invalid.
    let uri = format!("{}/{rdo_id}/reject", rdo_uri(company, project));
    let response = post(&app, &uri, Some(&manager), serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post(
        &app,
        &uri,
        Some(&manager),
        serde_json::json!({ "note": "Faltou o relatório de equipamentos" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "rejected");

    // Editing a rejected report clears the decision and returns to draft.
    let uri = format!("{}/{rdo_id}", rdo_uri(company, project));
    let response = put(
        &app,
        &uri,
        Some(&worker),
        serde_json::json!({ "equipment_notes": "Betoneira 400L em operação" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let edited = body_json(response).await;
    assert_eq!(edited["status"], "draft");
    assert!(edited["decision_note"].is_null());
    assert!(edited["approved_by"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn only_drafts_can_be_deleted(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, worker, company, project) = setup(&app).await;

    let response = post(
        &app,
        &rdo_uri(company, project),
        Some(&worker),
        serde_json::json!({ "report_date": "2026-03-02" }),
    )
    .await;
    let rdo_id = body_json(response).await["id"].as_i64().unwrap();

    let uri = format!("{}/{rdo_id}/submit", rdo_uri(company, project));
    post(&app, &uri, Some(&worker), serde_json::json!({})).await;

    let uri = format!("{}/{rdo_id}", rdo_uri(company, project));
    let response = delete(&app, &uri, Some(&worker)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_filters_by_status(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (_, worker, company, project) = setup(&app).await;

    for (date, submit) in [("2026-03-02", true), ("2026-03-03", false)] {
        let response = post(
            &app,
            &rdo_uri(company, project),
            Some(&worker),
            serde_json::json!({ "report_date": date }),
        )
        .await;
        let rdo_id = body_json(response).await["id"].as_i64().unwrap();
        if submit {
            let uri = format!("{}/{rdo_id}/submit", rdo_uri(company, project));
            post(&app, &uri, Some(&worker), serde_json::json!({})).await;
        }
    }

    let uri = format!("{}?status=submitted", rdo_uri(company, project));
    let response = get(&app, &uri, Some(&worker)).await;
    let rdos = body_json(response).await;
    let list = rdos.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["report_date"], "2026-03-02");
}
