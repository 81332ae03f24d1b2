//! Repository for surveys, questions, responses, and answers.

use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::survey::{
    CreateSurvey, SubmitResponse, Survey, SurveyQuestion, SurveyResponse,
};

const SURVEY_COLUMNS: &str = "id, company_id, title, status, public_token, created_by, \
                              archived_at, created_at, updated_at";
const QUESTION_COLUMNS: &str = "id, survey_id, position, text, kind";

/// Provides survey lifecycle and response operations.
pub struct SurveyRepo;

impl SurveyRepo {
    /// Create a draft survey with its questions in one transaction.
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        created_by: DbId,
        public_token: &str,
        input: &CreateSurvey,
    ) -> Result<Survey, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO surveys (company_id, title, public_token, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {SURVEY_COLUMNS}"
        );
        let survey = sqlx::query_as::<_, Survey>(&query)
            .bind(company_id)
            .bind(&input.title)
            .bind(public_token)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        for (position, question) in input.questions.iter().enumerate() {
            sqlx::query(
                "INSERT INTO survey_questions (survey_id, position, text, kind)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(survey.id)
            .bind(position as i32)
            .bind(&question.text)
            .bind(&question.kind)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(survey)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!("SELECT {SURVEY_COLUMNS} FROM surveys WHERE id = $1 AND company_id = $2");
        sqlx::query_as::<_, Survey>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve a survey by its public response token (no tenant scope; the
    /// token itself is the capability).
    pub async fn find_by_public_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!("SELECT {SURVEY_COLUMNS} FROM surveys WHERE public_token = $1");
        sqlx::query_as::<_, Survey>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, company_id: DbId) -> Result<Vec<Survey>, sqlx::Error> {
        let query = format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys WHERE company_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Survey>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_questions(
        pool: &PgPool,
        survey_id: DbId,
    ) -> Result<Vec<SurveyQuestion>, sqlx::Error> {
        let query = format!(
            "SELECT {QUESTION_COLUMNS} FROM survey_questions WHERE survey_id = $1 ORDER BY position"
        );
        sqlx::query_as::<_, SurveyQuestion>(&query)
            .bind(survey_id)
            .fetch_all(pool)
            .await
    }

    /// Count active surveys, for plan-limit checks.
    pub async fn count_active(pool: &PgPool, company_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM surveys WHERE company_id = $1 AND status = 'active'",
        )
        .bind(company_id)
        .fetch_one(pool)
        .await
    }

    /// `draft|archived -> active`. Returns `None` when already active or
    /// missing.
    pub async fn activate(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!(
            "UPDATE surveys SET status = 'active', archived_at = NULL, updated_at = NOW()
             WHERE id = $1 AND company_id = $2 AND status <> 'active'
             RETURNING {SURVEY_COLUMNS}"
        );
        sqlx::query_as::<_, Survey>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn archive(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!(
            "UPDATE surveys SET status = 'archived', archived_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND company_id = $2 AND status <> 'archived'
             RETURNING {SURVEY_COLUMNS}"
        );
        sqlx::query_as::<_, Survey>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// Store a response and its answers in one transaction. Answer
    /// validation against question kinds happens in the handler.
    pub async fn insert_response(
        pool: &PgPool,
        survey_id: DbId,
        input: &SubmitResponse,
    ) -> Result<SurveyResponse, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let response = sqlx::query_as::<_, SurveyResponse>(
            "INSERT INTO survey_responses (survey_id, respondent_name)
             VALUES ($1, $2)
             RETURNING id, survey_id, respondent_name, submitted_at",
        )
        .bind(survey_id)
        .bind(&input.respondent_name)
        .fetch_one(&mut *tx)
        .await?;

        for answer in &input.answers {
            sqlx::query(
                "INSERT INTO survey_answers (response_id, question_id, value_text, value_rating, value_bool)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(response.id)
            .bind(answer.question_id)
            .bind(&answer.value_text)
            .bind(answer.value_rating)
            .bind(answer.value_bool)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(response)
    }

    pub async fn list_responses(
        pool: &PgPool,
        survey_id: DbId,
    ) -> Result<Vec<SurveyResponse>, sqlx::Error> {
        sqlx::query_as::<_, SurveyResponse>(
            "SELECT id, survey_id, respondent_name, submitted_at
             FROM survey_responses WHERE survey_id = $1 ORDER BY submitted_at DESC",
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await
    }
}
