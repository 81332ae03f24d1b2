//! Handlers for the `/companies/{company_id}/inbox` resource: conversations,
//! messages, reply suggestions, and the template/knowledge CRUD feeding the
//! suggestion engine.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use canteiro_core::error::CoreError;
use canteiro_core::pagination::{clamp_limit, clamp_offset};
use canteiro_core::suggest::{
    suggest_replies, KnowledgeCandidate, RenderContext, Suggestion, TemplateCandidate,
};
use canteiro_core::types::DbId;
use canteiro_db::models::inbox::{
    Conversation, CreateConversation, CreateMessage, Message, DIRECTION_INBOUND,
    DIRECTION_OUTBOUND,
};
use canteiro_db::models::ai::{CreateAiTemplate, CreateKnowledgeItem, UpdateAiTemplate};
use canteiro_db::repositories::{AiRepo, CompanyRepo, InboxRepo, UsageRepo};
use canteiro_events::bus::event_types;
use canteiro_events::DomainEvent;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::scope::CompanyScope;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

const VALID_CHANNELS: &[&str] = &["whatsapp", "web"];

/// Conversation with its messages.
#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// POST /api/v1/companies/{company_id}/inbox/conversations
pub async fn create_conversation(
    scope: CompanyScope,
    State(state): State<AppState>,
    Json(input): Json<CreateConversation>,
) -> AppResult<(StatusCode, Json<Conversation>)> {
    if input.contact_name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "contact_name must not be empty".into(),
        )));
    }
    if !VALID_CHANNELS.contains(&input.channel.as_str()) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown channel: {}",
            input.channel
        ))));
    }

    let conversation =
        InboxRepo::create_conversation(&state.pool, scope.company_id, &input).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/v1/companies/{company_id}/inbox/conversations
pub async fn list_conversations(
    scope: CompanyScope,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, 50, 200);
    let offset = clamp_offset(params.offset);

    let conversations =
        InboxRepo::list_conversations(&state.pool, scope.company_id, limit, offset).await?;
    Ok(Json(DataResponse {
        data: conversations,
    }))
}

/// GET /api/v1/companies/{company_id}/inbox/conversations/{id}
///
/// Opening a conversation marks its inbound messages read.
pub async fn get_conversation(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<ConversationDetail>> {
    let conversation = InboxRepo::find_conversation(&state.pool, scope.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Conversation",
            id,
        }))?;

    InboxRepo::mark_read(&state.pool, conversation.id).await?;
    let messages = InboxRepo::list_messages(&state.pool, conversation.id).await?;

    Ok(Json(ConversationDetail {
        conversation,
        messages,
    }))
}

/// POST /api/v1/companies/{company_id}/inbox/conversations/{id}/messages
///
/// Inbound messages publish `inbox.message_received` and bump the usage
/// counter.
pub async fn append_message(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
    Json(input): Json<CreateMessage>,
) -> AppResult<(StatusCode, Json<Message>)> {
    if !matches!(input.direction.as_str(), DIRECTION_INBOUND | DIRECTION_OUTBOUND) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown direction: {}",
            input.direction
        ))));
    }
    if input.body.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "body must not be empty".into(),
        )));
    }

    let conversation = InboxRepo::find_conversation(&state.pool, scope.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Conversation",
            id,
        }))?;

    if conversation.status != "open" {
        return Err(AppError::Core(CoreError::Conflict(
            "Conversation is closed".into(),
        )));
    }

    let message =
        InboxRepo::append_message(&state.pool, conversation.id, &input.direction, &input.body)
            .await?;

    UsageRepo::refresh_counters(&state.pool, scope.company_id, 1).await?;

    if message.direction == DIRECTION_INBOUND {
        state.event_bus.publish(
            DomainEvent::new(event_types::INBOX_MESSAGE_RECEIVED)
                .with_source("conversation", conversation.id)
                .with_company(scope.company_id)
                .with_payload(serde_json::json!({
                    "contact_name": conversation.contact_name,
                })),
        );
    }

    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/v1/companies/{company_id}/inbox/conversations/{id}/close
pub async fn close_conversation(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Conversation>> {
    set_status(scope, state, id, "closed").await
}

/// POST /api/v1/companies/{company_id}/inbox/conversations/{id}/reopen
pub async fn reopen_conversation(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Conversation>> {
    set_status(scope, state, id, "open").await
}

async fn set_status(
    scope: CompanyScope,
    state: AppState,
    id: DbId,
    status: &str,
) -> AppResult<Json<Conversation>> {
    let conversation = InboxRepo::set_status(&state.pool, scope.company_id, id, status)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Conversation",
            id,
        }))?;
    Ok(Json(conversation))
}

// ---------------------------------------------------------------------------
// Reply suggestions
// ---------------------------------------------------------------------------

/// POST /api/v1/companies/{company_id}/inbox/conversations/{id}/suggestions
///
/// Ranks the company's active reply templates against the latest inbound
/// message. An empty list is a valid answer.
pub async fn suggest(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Vec<Suggestion>>>> {
    let conversation = InboxRepo::find_conversation(&state.pool, scope.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Conversation",
            id,
        }))?;

    let Some(latest) = InboxRepo::latest_inbound_message(&state.pool, conversation.id).await?
    else {
        return Ok(Json(DataResponse { data: vec![] }));
    };

    let templates: Vec<TemplateCandidate> =
        AiRepo::list_active_templates(&state.pool, scope.company_id)
            .await?
            .into_iter()
            .map(|t| TemplateCandidate {
                id: t.id,
                trigger_keywords: t.trigger_keywords,
                body: t.body,
            })
            .collect();

    let knowledge: Vec<KnowledgeCandidate> =
        AiRepo::list_knowledge_items(&state.pool, scope.company_id)
            .await?
            .into_iter()
            .map(|k| KnowledgeCandidate {
                id: k.id,
                title: k.title,
                body: k.body,
            })
            .collect();

    let company_name = CompanyRepo::find_by_id(&state.pool, scope.company_id)
        .await?
        .map(|c| c.name)
        .unwrap_or_default();

    let suggestions = suggest_replies(
        &latest.body,
        &templates,
        &knowledge,
        &RenderContext {
            contact_name: &conversation.contact_name,
            company_name: &company_name,
        },
    );

    Ok(Json(DataResponse { data: suggestions }))
}

// ---------------------------------------------------------------------------
// Templates & knowledge base
// ---------------------------------------------------------------------------

/// POST /api/v1/companies/{company_id}/inbox/templates
pub async fn create_template(
    scope: CompanyScope,
    State(state): State<AppState>,
    Json(input): Json<CreateAiTemplate>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() || input.body.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "name and body must not be empty".into(),
        )));
    }

    let template = AiRepo::create_template(&state.pool, scope.company_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/companies/{company_id}/inbox/templates
pub async fn list_templates(
    scope: CompanyScope,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let templates = AiRepo::list_templates(&state.pool, scope.company_id).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// PUT /api/v1/companies/{company_id}/inbox/templates/{id}
pub async fn update_template(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateAiTemplate>,
) -> AppResult<impl IntoResponse> {
    let template = AiRepo::update_template(&state.pool, scope.company_id, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id,
        }))?;
    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/companies/{company_id}/inbox/templates/{id}
pub async fn delete_template(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let deleted = AiRepo::delete_template(&state.pool, scope.company_id, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id,
        }))
    }
}

/// POST /api/v1/companies/{company_id}/inbox/knowledge
pub async fn create_knowledge_item(
    scope: CompanyScope,
    State(state): State<AppState>,
    Json(input): Json<CreateKnowledgeItem>,
) -> AppResult<impl IntoResponse> {
    if input.title.trim().is_empty() || input.body.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "title and body must not be empty".into(),
        )));
    }

    let item = AiRepo::create_knowledge_item(&state.pool, scope.company_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// GET /api/v1/companies/{company_id}/inbox/knowledge
pub async fn list_knowledge_items(
    scope: CompanyScope,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let items = AiRepo::list_knowledge_items(&state.pool, scope.company_id).await?;
    Ok(Json(DataResponse { data: items }))
}

/// DELETE /api/v1/companies/{company_id}/inbox/knowledge/{id}
pub async fn delete_knowledge_item(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let deleted = AiRepo::delete_knowledge_item(&state.pool, scope.company_id, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "KnowledgeItem",
            id,
        }))
    }
}
