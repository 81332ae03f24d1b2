//! Repository for reply templates and knowledge-base items.

use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::ai::{
    AiTemplate, CreateAiTemplate, CreateKnowledgeItem, KnowledgeItem, UpdateAiTemplate,
};

const TEMPLATE_COLUMNS: &str =
    "id, company_id, name, trigger_keywords, body, is_active, created_at, updated_at";
const KNOWLEDGE_COLUMNS: &str = "id, company_id, title, body, created_at, updated_at";

/// Provides CRUD for the suggestion engine's source material.
pub struct AiRepo;

impl AiRepo {
    pub async fn create_template(
        pool: &PgPool,
        company_id: DbId,
        input: &CreateAiTemplate,
    ) -> Result<AiTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO ai_templates (company_id, name, trigger_keywords, body)
             VALUES ($1, $2, $3, $4)
             RETURNING {TEMPLATE_COLUMNS}"
        );
        sqlx::query_as::<_, AiTemplate>(&query)
            .bind(company_id)
            .bind(&input.name)
            .bind(&input.trigger_keywords)
            .bind(&input.body)
            .fetch_one(pool)
            .await
    }

    pub async fn list_templates(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<AiTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM ai_templates WHERE company_id = $1 ORDER BY name"
        );
        sqlx::query_as::<_, AiTemplate>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    /// Active templates only, the candidate set for suggestions.
    pub async fn list_active_templates(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<AiTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM ai_templates
             WHERE company_id = $1 AND is_active ORDER BY id"
        );
        sqlx::query_as::<_, AiTemplate>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update_template(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
        input: &UpdateAiTemplate,
    ) -> Result<Option<AiTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE ai_templates SET
                name = COALESCE($3, name),
                trigger_keywords = COALESCE($4, trigger_keywords),
                body = COALESCE($5, body),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
             WHERE id = $1 AND company_id = $2
             RETURNING {TEMPLATE_COLUMNS}"
        );
        sqlx::query_as::<_, AiTemplate>(&query)
            .bind(id)
            .bind(company_id)
            .bind(&input.name)
            .bind(&input.trigger_keywords)
            .bind(&input.body)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_template(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ai_templates WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- Knowledge items ----------------------------------------------------

    pub async fn create_knowledge_item(
        pool: &PgPool,
        company_id: DbId,
        input: &CreateKnowledgeItem,
    ) -> Result<KnowledgeItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO knowledge_items (company_id, title, body)
             VALUES ($1, $2, $3)
             RETURNING {KNOWLEDGE_COLUMNS}"
        );
        sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(company_id)
            .bind(&input.title)
            .bind(&input.body)
            .fetch_one(pool)
            .await
    }

    pub async fn list_knowledge_items(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<KnowledgeItem>, sqlx::Error> {
        let query = format!(
            "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_items WHERE company_id = $1 ORDER BY title"
        );
        sqlx::query_as::<_, KnowledgeItem>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    pub async fn delete_knowledge_item(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM knowledge_items WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
