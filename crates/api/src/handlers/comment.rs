//! Handlers for `/companies/{company_id}/comments`.
//!
//! Comments attach polymorphically to daily reports and incidents via
//! `(entity_type, entity_id)`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use canteiro_core::error::CoreError;
use canteiro_core::roles;
use canteiro_core::types::DbId;
use canteiro_db::models::comment::{
    Comment, CreateComment, COMMENT_ON_INCIDENT, COMMENT_ON_RDO,
};
use canteiro_db::repositories::CommentRepo;
use canteiro_events::bus::event_types;
use canteiro_events::DomainEvent;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::scope::CompanyScope;
use crate::state::AppState;

fn validate_entity_type(entity_type: &str) -> Result<(), AppError> {
    match entity_type {
        COMMENT_ON_RDO | COMMENT_ON_INCIDENT => Ok(()),
        other => Err(AppError::Core(CoreError::Validation(format!(
            "Comments cannot attach to entity type: {other}"
        )))),
    }
}

/// Query parameters for comment listings.
#[derive(Debug, Deserialize)]
pub struct ListCommentsParams {
    pub entity_type: String,
    pub entity_id: DbId,
}

/// POST /api/v1/companies/{company_id}/comments
///
/// The target entity must exist inside the caller's company.
pub async fn create(
    scope: CompanyScope,
    State(state): State<AppState>,
    Json(input): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    validate_entity_type(&input.entity_type)?;
    if input.body.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "body must not be empty".into(),
        )));
    }

    let target_exists = CommentRepo::entity_in_company(
        &state.pool,
        scope.company_id,
        &input.entity_type,
        input.entity_id,
    )
    .await?;
    if !target_exists {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Comment target",
            id: input.entity_id,
        }));
    }

    let comment = CommentRepo::create(
        &state.pool,
        scope.company_id,
        &input.entity_type,
        input.entity_id,
        scope.user_id,
        input.body.trim(),
    )
    .await?;

    state.event_bus.publish(
        DomainEvent::new(event_types::COMMENT_ADDED)
            .with_source(input.entity_type.clone(), input.entity_id)
            .with_company(scope.company_id)
            .with_actor(scope.user_id),
    );

    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/v1/companies/{company_id}/comments?entity_type=&entity_id=
pub async fn list(
    scope: CompanyScope,
    State(state): State<AppState>,
    Query(params): Query<ListCommentsParams>,
) -> AppResult<Json<Vec<Comment>>> {
    validate_entity_type(&params.entity_type)?;

    let comments = CommentRepo::list_for_entity(
        &state.pool,
        scope.company_id,
        &params.entity_type,
        params.entity_id,
    )
    .await?;
    Ok(Json(comments))
}

/// DELETE /api/v1/companies/{company_id}/comments/{id}
///
/// Authors delete their own comments; company admins delete any.
pub async fn delete(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let comment = CommentRepo::find_by_id(&state.pool, scope.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Comment",
            id,
        }))?;

    if comment.author_id != scope.user_id && !roles::can_administer(&scope.role) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the author or an admin may delete a comment".into(),
        )));
    }

    CommentRepo::delete(&state.pool, scope.company_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
