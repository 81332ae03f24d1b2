//! Survey, question, response, and answer models.

use canteiro_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const SURVEY_DRAFT: &str = "draft";
pub const SURVEY_ACTIVE: &str = "active";
pub const SURVEY_ARCHIVED: &str = "archived";

pub const QUESTION_TEXT: &str = "text";
pub const QUESTION_RATING: &str = "rating";
pub const QUESTION_YES_NO: &str = "yes_no";

/// A survey row from the `surveys` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Survey {
    pub id: DbId,
    pub company_id: DbId,
    pub title: String,
    pub status: String,
    /// Token used by the public response endpoint; not secret, but unguessable.
    pub public_token: String,
    pub created_by: DbId,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A question row from the `survey_questions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveyQuestion {
    pub id: DbId,
    pub survey_id: DbId,
    pub position: i32,
    pub text: String,
    pub kind: String,
}

/// DTO for creating a survey with its questions in one call.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSurvey {
    pub title: String,
    pub questions: Vec<CreateSurveyQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSurveyQuestion {
    pub text: String,
    pub kind: String,
}

/// A response row from the `survey_responses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveyResponse {
    pub id: DbId,
    pub survey_id: DbId,
    pub respondent_name: Option<String>,
    pub submitted_at: Timestamp,
}

/// An answer row from the `survey_answers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveyAnswer {
    pub id: DbId,
    pub response_id: DbId,
    pub question_id: DbId,
    pub value_text: Option<String>,
    pub value_rating: Option<i32>,
    pub value_bool: Option<bool>,
}

/// DTO for submitting a public response.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub respondent_name: Option<String>,
    pub answers: Vec<SubmitAnswer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswer {
    pub question_id: DbId,
    pub value_text: Option<String>,
    pub value_rating: Option<i32>,
    pub value_bool: Option<bool>,
}
