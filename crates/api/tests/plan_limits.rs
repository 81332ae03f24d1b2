//! Plan-ceiling enforcement: project creation and survey activation on the
//! free plan, plus the public survey response endpoint's lifecycle rules.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_company, create_project, get, post, signup};
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn free_plan_caps_projects_at_three(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, _) = signup(&app, "dona@alfa.com").await;
    let company = create_company(&app, &token, "Construtora Alfa").await;

    for n in 1..=3 {
        create_project(&app, &token, company, &format!("Obra {n}")).await;
    }

    let response = post(
        &app,
        &format!("/api/v1/companies/{company}/projects"),
        Some(&token),
        serde_json::json!({ "name": "Obra 4" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "PLAN_LIMIT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn free_plan_caps_active_surveys_at_two(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, _) = signup(&app, "dona@alfa.com").await;
    let company = create_company(&app, &token, "Construtora Alfa").await;

    let mut ids = Vec::new();
    for n in 1..=3 {
        let response = post(
            &app,
            &format!("/api/v1/companies/{company}/surveys"),
            Some(&token),
            serde_json::json!({
                "title": format!("Pesquisa {n}"),
                "questions": [ { "text": "Como foi o atendimento?", "kind": "text" } ],
            }),
        )
        .await;
        ids.push(body_json(response).await["id"].as_i64().unwrap());
    }

    for id in &ids[..2] {
        let response = post(
            &app,
            &format!("/api/v1/companies/{company}/surveys/{id}/activate"),
            Some(&token),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = post(
        &app,
        &format!("/api/v1/companies/{company}/surveys/{}/activate", ids[2]),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "PLAN_LIMIT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn public_responses_follow_survey_lifecycle(pool: PgPool) {
    let app = common::build_test_app(pool);
    let (token, _) = signup(&app, "dona@alfa.com").await;
    let company = create_company(&app, &token, "Construtora Alfa").await;

    let response = post(
        &app,
        &format!("/api/v1/companies/{company}/surveys"),
        Some(&token),
        serde_json::json!({
            "title": "Satisfação pós-obra",
            "questions": [
                { "text": "Nota geral?", "kind": "rating" },
                { "text": "Indicaria a empresa?", "kind": "yes_no" },
            ],
        }),
    )
    .await;
    let survey = body_json(response).await;
    let survey_id = survey["id"].as_i64().unwrap();
    let public_token = survey["public_token"].as_str().unwrap().to_string();
    let q_rating = survey["questions"][0]["id"].as_i64().unwrap();
    let q_yes_no = survey["questions"][1]["id"].as_i64().unwrap();

    let answers = serde_json::json!({
        "respondent_name": "Cliente Silva",
        "answers": [
            { "question_id": q_rating, "value_rating": 5 },
            { "question_id": q_yes_no, "value_bool": true },
        ],
    });
    let uri = format!("/api/v1/surveys/{public_token}/responses");

    // Drafts are not public yet.
    let response = post(&app, &uri, None, answers.clone()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    post(
        &app,
        &format!("/api/v1/companies/{company}/surveys/{survey_id}/activate"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;

    // Active surveys accept valid responses anonymously.
    let response = post(&app, &uri, None, answers.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Mismatched answer kinds are rejected.
    let bad = serde_json::json!({
        "answers": [ { "question_id": q_rating, "value_text": "cinco" } ],
    });
    let response = post(&app, &uri, None, bad).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Archived surveys are gone for respondents.
    post(
        &app,
        &format!("/api/v1/companies/{company}/surveys/{survey_id}/archive"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    let response = post(&app, &uri, None, answers).await;
    assert_eq!(response.status(), StatusCode::GONE);

    // The accepted response is visible to the company.
    let response = get(
        &app,
        &format!("/api/v1/companies/{company}/surveys/{survey_id}/responses"),
        Some(&token),
    )
    .await;
    let responses = body_json(response).await;
    assert_eq!(responses["data"].as_array().unwrap().len(), 1);
}
