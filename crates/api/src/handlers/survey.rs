//! Handlers for `/companies/{company_id}/surveys` plus the public,
//! token-addressed response endpoint.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use canteiro_core::error::CoreError;
use canteiro_core::plan::within_limit;
use canteiro_core::types::DbId;
use canteiro_db::models::survey::{
    CreateSurvey, SubmitResponse, Survey, SurveyQuestion, SURVEY_ACTIVE, QUESTION_RATING,
    QUESTION_TEXT, QUESTION_YES_NO,
};
use canteiro_db::repositories::SurveyRepo;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::project::effective_plan;
use crate::middleware::scope::CompanyScope;
use crate::response::DataResponse;
use crate::state::AppState;

const VALID_KINDS: &[&str] = &[QUESTION_TEXT, QUESTION_RATING, QUESTION_YES_NO];

/// Survey with its ordered questions.
#[derive(Debug, Serialize)]
pub struct SurveyDetail {
    #[serde(flatten)]
    pub survey: Survey,
    pub questions: Vec<SurveyQuestion>,
}

/// POST /api/v1/companies/{company_id}/surveys
pub async fn create(
    scope: CompanyScope,
    State(state): State<AppState>,
    Json(input): Json<CreateSurvey>,
) -> AppResult<(StatusCode, Json<SurveyDetail>)> {
    if input.title.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "title must not be empty".into(),
        )));
    }
    if input.questions.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "A survey needs at least one question".into(),
        )));
    }
    for question in &input.questions {
        if !VALID_KINDS.contains(&question.kind.as_str()) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown question kind: {}",
                question.kind
            ))));
        }
    }

    let public_token = Uuid::new_v4().simple().to_string();
    let survey = SurveyRepo::create(
        &state.pool,
        scope.company_id,
        scope.user_id,
        &public_token,
        &input,
    )
    .await?;
    let questions = SurveyRepo::list_questions(&state.pool, survey.id).await?;

    tracing::info!(company_id = scope.company_id, survey_id = survey.id, "Survey created");
    Ok((
        StatusCode::CREATED,
        Json(SurveyDetail { survey, questions }),
    ))
}

/// GET /api/v1/companies/{company_id}/surveys
pub async fn list(
    scope: CompanyScope,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Survey>>> {
    let surveys = SurveyRepo::list(&state.pool, scope.company_id).await?;
    Ok(Json(surveys))
}

/// GET /api/v1/companies/{company_id}/surveys/{id}
pub async fn get_by_id(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<SurveyDetail>> {
    let survey = SurveyRepo::find_by_id(&state.pool, scope.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Survey",
            id,
        }))?;
    let questions = SurveyRepo::list_questions(&state.pool, survey.id).await?;
    Ok(Json(SurveyDetail { survey, questions }))
}

/// POST /api/v1/companies/{company_id}/surveys/{id}/activate
///
/// Activation is gated by the plan's active-survey ceiling.
pub async fn activate(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Survey>> {
    let plan = effective_plan(&state, scope.company_id).await?;
    let active = SurveyRepo::count_active(&state.pool, scope.company_id).await?;
    if !within_limit(plan.max_active_surveys(), active) {
        return Err(AppError::Core(CoreError::PlanLimit(format!(
            "The {} plan allows at most {} active surveys",
            plan.as_str(),
            plan.max_active_surveys().unwrap_or_default()
        ))));
    }

    let survey = SurveyRepo::activate(&state.pool, scope.company_id, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Survey is already active or does not exist".into(),
            ))
        })?;
    Ok(Json(survey))
}

/// POST /api/v1/companies/{company_id}/surveys/{id}/archive
pub async fn archive(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Survey>> {
    let survey = SurveyRepo::archive(&state.pool, scope.company_id, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Survey is already archived or does not exist".into(),
            ))
        })?;
    Ok(Json(survey))
}

/// GET /api/v1/companies/{company_id}/surveys/{id}/responses
pub async fn list_responses(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    // Scope check via lookup; responses themselves hang off the survey.
    SurveyRepo::find_by_id(&state.pool, scope.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Survey",
            id,
        }))?;

    let responses = SurveyRepo::list_responses(&state.pool, id).await?;
    Ok(Json(DataResponse { data: responses }))
}

// ---------------------------------------------------------------------------
// Public response endpoint
// ---------------------------------------------------------------------------

/// POST /api/v1/surveys/{public_token}/responses
///
/// Unauthenticated: the token is the capability. Archived surveys return
/// 410; drafts 404 (never published, the token should not circulate).
pub async fn submit_response(
    State(state): State<AppState>,
    Path(public_token): Path<String>,
    Json(input): Json<SubmitResponse>,
) -> AppResult<StatusCode> {
    let survey = SurveyRepo::find_by_public_token(&state.pool, &public_token)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Survey",
            id: 0,
        }))?;

    match survey.status.as_str() {
        SURVEY_ACTIVE => {}
        "archived" => {
            return Err(AppError::Core(CoreError::Gone(
                "This survey no longer accepts responses".into(),
            )))
        }
        _ => {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Survey",
                id: survey.id,
            }))
        }
    }

    let questions = SurveyRepo::list_questions(&state.pool, survey.id).await?;
    validate_answers(&questions, &input)?;

    SurveyRepo::insert_response(&state.pool, survey.id, &input).await?;
    Ok(StatusCode::CREATED)
}

/// Every answer must reference a question of this survey and carry the
/// value field matching the question kind.
fn validate_answers(
    questions: &[SurveyQuestion],
    input: &SubmitResponse,
) -> Result<(), AppError> {
    for answer in &input.answers {
        let question = questions
            .iter()
            .find(|q| q.id == answer.question_id)
            .ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!(
                    "Unknown question id: {}",
                    answer.question_id
                )))
            })?;

        let valid = match question.kind.as_str() {
            QUESTION_TEXT => answer.value_text.is_some(),
            QUESTION_RATING => answer.value_rating.is_some_and(|r| (1..=5).contains(&r)),
            QUESTION_YES_NO => answer.value_bool.is_some(),
            _ => false,
        };
        if !valid {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Answer to question {} does not match its kind ({})",
                question.id, question.kind
            ))));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canteiro_db::models::survey::SubmitAnswer;

    fn question(id: DbId, kind: &str) -> SurveyQuestion {
        SurveyQuestion {
            id,
            survey_id: 1,
            position: 0,
            text: "q".into(),
            kind: kind.into(),
        }
    }

    fn answer(question_id: DbId) -> SubmitAnswer {
        SubmitAnswer {
            question_id,
            value_text: None,
            value_rating: None,
            value_bool: None,
        }
    }

    #[test]
    fn rating_answers_must_be_in_range() {
        let questions = vec![question(1, QUESTION_RATING)];

        let ok = SubmitResponse {
            respondent_name: None,
            answers: vec![SubmitAnswer {
                value_rating: Some(5),
                ..answer(1)
            }],
        };
        assert!(validate_answers(&questions, &ok).is_ok());

        let out_of_range = SubmitResponse {
            respondent_name: None,
            answers: vec![SubmitAnswer {
                value_rating: Some(6),
                ..answer(1)
            }],
        };
        assert!(validate_answers(&questions, &out_of_range).is_err());
    }

    #[test]
    fn answer_kind_must_match_question_kind() {
        let questions = vec![question(1, QUESTION_YES_NO)];

        let wrong_kind = SubmitResponse {
            respondent_name: None,
            answers: vec![SubmitAnswer {
                value_text: Some("sim".into()),
                ..answer(1)
            }],
        };
        assert!(validate_answers(&questions, &wrong_kind).is_err());
    }

    #[test]
    fn unknown_question_id_is_rejected() {
        let questions = vec![question(1, QUESTION_TEXT)];
        let unknown = SubmitResponse {
            respondent_name: None,
            answers: vec![SubmitAnswer {
                value_text: Some("resposta".into()),
                ..answer(99)
            }],
        };
        assert!(validate_answers(&questions, &unknown).is_err());
    }
}
