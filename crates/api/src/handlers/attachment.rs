//! Handlers for `/companies/{company_id}/attachments`.
//!
//! Uploads are `multipart/form-data`; bytes go to the storage provider and
//! metadata to Postgres. The row is written only after a successful
//! provider write, so a failed upload leaves nothing behind.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use canteiro_core::error::CoreError;
use canteiro_core::types::DbId;
use canteiro_db::models::attachment::{Attachment, CreateAttachment};
use canteiro_db::repositories::{AttachmentRepo, CommentRepo};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::project::effective_plan;
use crate::middleware::scope::CompanyScope;
use crate::state::AppState;

/// How long presigned download URLs stay valid.
const DOWNLOAD_URL_EXPIRY_SECS: u64 = 600;

const VALID_ENTITY_TYPES: &[&str] = &["project", "rdo", "incident"];

/// Query parameters naming the entity an attachment belongs to.
#[derive(Debug, Deserialize)]
pub struct EntityParams {
    pub entity_type: String,
    pub entity_id: DbId,
}

/// Response for `GET .../attachments/{id}/download`.
#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
}

fn validate_entity(params: &EntityParams) -> Result<(), AppError> {
    if VALID_ENTITY_TYPES.contains(&params.entity_type.as_str()) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Validation(format!(
            "Attachments cannot attach to entity type: {}",
            params.entity_type
        ))))
    }
}

/// POST /api/v1/companies/{company_id}/attachments?entity_type=&entity_id=
///
/// Accepts a single `file` part. Enforces the per-request size ceiling and
/// the plan's total storage ceiling.
pub async fn upload(
    scope: CompanyScope,
    State(state): State<AppState>,
    Query(params): Query<EntityParams>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Attachment>)> {
    validate_entity(&params)?;

    let target_exists = CommentRepo::entity_in_company(
        &state.pool,
        scope.company_id,
        &params.entity_type,
        params.entity_id,
    )
    .await?;
    if !target_exists {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Attachment target",
            id: params.entity_id,
        }));
    }

    // Read the single expected `file` part.
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
        .ok_or_else(|| AppError::BadRequest("Missing file part".into()))?;

    let file_name = field
        .file_name()
        .map(sanitize_file_name)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadRequest("File part must carry a filename".into()))?;
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;

    if bytes.len() > state.config.max_upload_bytes {
        return Err(AppError::Core(CoreError::Validation(format!(
            "File exceeds the {} byte upload limit",
            state.config.max_upload_bytes
        ))));
    }

    let plan = effective_plan(&state, scope.company_id).await?;
    let used = AttachmentRepo::total_bytes(&state.pool, scope.company_id).await?;
    if let Some(max) = plan.max_storage_bytes() {
        if used + bytes.len() as i64 > max {
            return Err(AppError::Core(CoreError::PlanLimit(format!(
                "The {} plan allows at most {max} bytes of storage",
                plan.as_str()
            ))));
        }
    }

    let storage_key = format!("{}/{}/{}", scope.company_id, Uuid::new_v4(), file_name);
    state
        .storage
        .put(&storage_key, bytes.to_vec(), &content_type)
        .await
        .map_err(|e| AppError::InternalError(format!("Storage write failed: {e}")))?;

    let attachment = AttachmentRepo::create(
        &state.pool,
        scope.company_id,
        &CreateAttachment {
            entity_type: params.entity_type,
            entity_id: params.entity_id,
            file_name,
            content_type,
            size_bytes: bytes.len() as i64,
            storage_key,
            uploaded_by: scope.user_id,
        },
    )
    .await?;

    tracing::info!(
        company_id = scope.company_id,
        attachment_id = attachment.id,
        size_bytes = attachment.size_bytes,
        "Attachment uploaded"
    );
    Ok((StatusCode::CREATED, Json(attachment)))
}

/// GET /api/v1/companies/{company_id}/attachments?entity_type=&entity_id=
pub async fn list(
    scope: CompanyScope,
    State(state): State<AppState>,
    Query(params): Query<EntityParams>,
) -> AppResult<Json<Vec<Attachment>>> {
    validate_entity(&params)?;

    let attachments = AttachmentRepo::list_for_entity(
        &state.pool,
        scope.company_id,
        &params.entity_type,
        params.entity_id,
    )
    .await?;
    Ok(Json(attachments))
}

/// GET /api/v1/companies/{company_id}/attachments/{id}/download
///
/// Returns a short-lived URL rather than streaming through the API.
pub async fn download(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DownloadResponse>> {
    let attachment = AttachmentRepo::find_by_id(&state.pool, scope.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Attachment",
            id,
        }))?;

    let url = state
        .storage
        .presign_get(&attachment.storage_key, DOWNLOAD_URL_EXPIRY_SECS)
        .await
        .map_err(|e| AppError::InternalError(format!("Presign failed: {e}")))?;

    Ok(Json(DownloadResponse { url }))
}

/// DELETE /api/v1/companies/{company_id}/attachments/{id}
///
/// The metadata row goes first; a failed object delete is logged and left
/// for storage lifecycle rules to reap.
pub async fn delete(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let attachment = AttachmentRepo::delete(&state.pool, scope.company_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Attachment",
            id,
        }))?;

    if let Err(e) = state.storage.delete(&attachment.storage_key).await {
        tracing::warn!(
            error = %e,
            storage_key = %attachment.storage_key,
            "Failed to delete stored object"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Keep the base name only and drop path separators.
fn sanitize_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}
