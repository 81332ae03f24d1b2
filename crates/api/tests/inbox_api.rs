//! Integration tests for the inbox: conversations, messages, unread
//! counts, and reply suggestions.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, create_company, get, post, signup};
use sqlx::PgPool;

async fn setup(app: &Router) -> (String, i64) {
    let (token, _) = signup(app, "atendimento@alfa.com").await;
    let company = create_company(app, &token, "Construtora Alfa").await;
    (token, company)
}

async fn open_conversation(app: &Router, token: &str, company: i64, contact: &str) -> i64 {
    let response = post(
        app,
        &format!("/api/v1/companies/{company}/inbox/conversations"),
        Some(token),
        serde_json::json!({ "contact_name": contact, "channel": "whatsapp" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_i64().unwrap()
}

async fn send_message(
    app: &Router,
    token: &str,
    company: i64,
    conversation: i64,
    direction: &str,
    body: &str,
) -> StatusCode {
    post(
        app,
        &format!("/api/v1/companies/{company}/inbox/conversations/{conversation}/messages"),
        Some(token),
        serde_json::json!({ "direction": direction, "body": body }),
    )
    .await
    .status()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unread_counts_track_inbound_messages(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, company) = setup(&app).await;

    let conversation = open_conversation(&app, &token, company, "Marcos").await;
    send_message(&app, &token, company, conversation, "inbound", "Bom dia!").await;
    send_message(&app, &token, company, conversation, "inbound", "Podem me ligar?").await;
    send_message(&app, &token, company, conversation, "outbound", "Claro!").await;

    let response = get(
        &app,
        &format!("/api/v1/companies/{company}/inbox/conversations"),
        Some(&token),
    )
    .await;
    let list = body_json(response).await;
    let summary = &list["data"][0];
    assert_eq!(summary["unread_count"], 2, "only inbound messages count");

    // Opening the conversation marks them read.
    let response = get(
        &app,
        &format!("/api/v1/companies/{company}/inbox/conversations/{conversation}"),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_json(response).await;
    assert_eq!(detail["messages"].as_array().unwrap().len(), 3);

    let response = get(
        &app,
        &format!("/api/v1/companies/{company}/inbox/conversations"),
        Some(&token),
    )
    .await;
    let list = body_json(response).await;
    assert_eq!(list["data"][0]["unread_count"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn closed_conversations_reject_new_messages(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, company) = setup(&app).await;

    let conversation = open_conversation(&app, &token, company, "Marcos").await;

    let response = post(
        &app,
        &format!("/api/v1/companies/{company}/inbox/conversations/{conversation}/close"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let status = send_message(&app, &token, company, conversation, "inbound", "Alô?").await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Reopening restores the flow.
    post(
        &app,
        &format!("/api/v1/companies/{company}/inbox/conversations/{conversation}/reopen"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    let status = send_message(&app, &token, company, conversation, "inbound", "Alô?").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn suggestions_rank_matching_templates_and_fill_placeholders(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, company) = setup(&app).await;

    // Two templates: one about budgets, one about scheduling visits.
    post(
        &app,
        &format!("/api/v1/companies/{company}/inbox/templates"),
        Some(&token),
        serde_json::json!({
            "name": "Orçamento",
            "trigger_keywords": "orçamento, preço, valor",
            "body": "Olá {{contact_name}}, a {{company_name}} envia o orçamento em até 2 dias úteis.",
        }),
    )
    .await;
    post(
        &app,
        &format!("/api/v1/companies/{company}/inbox/templates"),
        Some(&token),
        serde_json::json!({
            "name": "Visita",
            "trigger_keywords": "visita, agendar",
            "body": "Podemos agendar uma visita à obra.",
        }),
    )
    .await;
    post(
        &app,
        &format!("/api/v1/companies/{company}/inbox/knowledge"),
        Some(&token),
        serde_json::json!({
            "title": "Prazo de orçamento",
            "body": "Orçamentos são elaborados em até 2 dias úteis após a visita técnica.",
        }),
    )
    .await;

    let conversation = open_conversation(&app, &token, company, "Marcos").await;
    send_message(
        &app,
        &token,
        company,
        conversation,
        "inbound",
        "Qual o valor do orçamento para a reforma?",
    )
    .await;

    let response = post(
        &app,
        &format!("/api/v1/companies/{company}/inbox/conversations/{conversation}/suggestions"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let suggestions = body_json(response).await;
    let data = suggestions["data"].as_array().unwrap();

    assert_eq!(data.len(), 1, "the visit template must not match");
    let top = &data[0];
    assert!(top["body"]
        .as_str()
        .unwrap()
        .starts_with("Olá Marcos, a Construtora Alfa"));
    assert!(top["knowledge_snippet"]
        .as_str()
        .unwrap()
        .contains("2 dias úteis"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn conversation_without_inbound_messages_yields_no_suggestions(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, company) = setup(&app).await;

    let conversation = open_conversation(&app, &token, company, "Marcos").await;

    let response = post(
        &app,
        &format!("/api/v1/companies/{company}/inbox/conversations/{conversation}/suggestions"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let suggestions = body_json(response).await;
    assert_eq!(suggestions["data"].as_array().unwrap().len(), 0);
}
