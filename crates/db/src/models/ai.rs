//! Reply template and knowledge-base item models.

use canteiro_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A template row from the `ai_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AiTemplate {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    /// Comma-separated trigger keywords matched against inbound messages.
    pub trigger_keywords: String,
    pub body: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a template.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAiTemplate {
    pub name: String,
    pub trigger_keywords: String,
    pub body: String,
}

/// DTO for updating a template. All fields optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAiTemplate {
    pub name: Option<String>,
    pub trigger_keywords: Option<String>,
    pub body: Option<String>,
    pub is_active: Option<bool>,
}

/// A knowledge-base row from the `knowledge_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct KnowledgeItem {
    pub id: DbId,
    pub company_id: DbId,
    pub title: String,
    pub body: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a knowledge item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateKnowledgeItem {
    pub title: String,
    pub body: String,
}
