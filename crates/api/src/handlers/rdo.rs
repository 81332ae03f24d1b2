//! Handlers for the daily report (RDO) workflow under
//! `/companies/{company_id}/projects/{project_id}/rdos`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use canteiro_core::error::CoreError;
use canteiro_core::pagination::{clamp_limit, clamp_offset};
use canteiro_core::types::DbId;
use canteiro_db::models::rdo::{CreateRdo, Rdo, RdoFilter, UpdateRdo, RDO_DRAFT, RDO_SUBMITTED};
use canteiro_db::repositories::RdoRepo;
use canteiro_events::bus::event_types;
use canteiro_events::DomainEvent;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::scope::CompanyScope;
use crate::state::AppState;

const VALID_WEATHER: &[&str] = &["clear", "cloudy", "rainy"];

fn validate_weather(values: [&Option<String>; 2]) -> Result<(), AppError> {
    for value in values.into_iter().flatten() {
        if !VALID_WEATHER.contains(&value.as_str()) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown weather value: {value}"
            ))));
        }
    }
    Ok(())
}

/// Query parameters for RDO listings: status/date filters plus pagination.
#[derive(Debug, Deserialize)]
pub struct ListRdoParams {
    pub status: Option<String>,
    pub from: Option<chrono::NaiveDate>,
    pub to: Option<chrono::NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for approve/reject decisions.
#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    pub note: Option<String>,
}

/// POST /api/v1/companies/{company_id}/projects/{project_id}/rdos
///
/// One report per project per date; a duplicate maps to 409 via
/// `uq_rdos_project_report_date`.
pub async fn create(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id)): Path<(DbId, DbId)>,
    Json(input): Json<CreateRdo>,
) -> AppResult<(StatusCode, Json<Rdo>)> {
    validate_weather([&input.weather_morning, &input.weather_afternoon])?;
    if input.workforce_count.is_some_and(|c| c < 0) {
        return Err(AppError::Core(CoreError::Validation(
            "workforce_count must not be negative".into(),
        )));
    }

    let project = scope.load_project(&state.pool, project_id).await?;
    let rdo = RdoRepo::create(&state.pool, project.id, scope.user_id, &input).await?;

    tracing::info!(
        project_id = project.id,
        rdo_id = rdo.id,
        report_date = %rdo.report_date,
        "RDO created"
    );
    Ok((StatusCode::CREATED, Json(rdo)))
}

/// GET /api/v1/companies/{company_id}/projects/{project_id}/rdos
pub async fn list(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id)): Path<(DbId, DbId)>,
    Query(params): Query<ListRdoParams>,
) -> AppResult<Json<Vec<Rdo>>> {
    let project = scope.load_project(&state.pool, project_id).await?;

    let limit = clamp_limit(params.limit, 31, 100);
    let offset = clamp_offset(params.offset);

    let filter = RdoFilter {
        status: params.status,
        from: params.from,
        to: params.to,
    };
    let rdos = RdoRepo::list(&state.pool, project.id, &filter, limit, offset).await?;
    Ok(Json(rdos))
}

/// GET /api/v1/companies/{company_id}/projects/{project_id}/rdos/{id}
pub async fn get_by_id(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<Json<Rdo>> {
    let project = scope.load_project(&state.pool, project_id).await?;
    let rdo = RdoRepo::find_by_id(&state.pool, project.id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Rdo", id }))?;
    Ok(Json(rdo))
}

/// PUT /api/v1/companies/{company_id}/projects/{project_id}/rdos/{id}
///
/// Only draft and rejected reports are editable; editing a rejected report
/// returns it to draft.
pub async fn update(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<UpdateRdo>,
) -> AppResult<Json<Rdo>> {
    validate_weather([&input.weather_morning, &input.weather_afternoon])?;

    let project = scope.load_project(&state.pool, project_id).await?;

    let existing = RdoRepo::find_by_id(&state.pool, project.id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Rdo", id }))?;

    let rdo = RdoRepo::update_content(&state.pool, project.id, id, &input)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "A {} report cannot be edited",
                existing.status
            )))
        })?;
    Ok(Json(rdo))
}

/// DELETE /api/v1/companies/{company_id}/projects/{project_id}/rdos/{id}
///
/// Only drafts can be deleted.
pub async fn delete(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<StatusCode> {
    let project = scope.load_project(&state.pool, project_id).await?;

    let existing = RdoRepo::find_by_id(&state.pool, project.id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Rdo", id }))?;

    if existing.status != RDO_DRAFT {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "A {} report cannot be deleted",
            existing.status
        ))));
    }

    RdoRepo::delete_draft(&state.pool, project.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/companies/{company_id}/projects/{project_id}/rdos/{id}/submit
///
/// `draft -> submitted`. Publishes `rdo.submitted`.
pub async fn submit(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<Json<Rdo>> {
    let project = scope.load_project(&state.pool, project_id).await?;

    let Some(rdo) = RdoRepo::submit(&state.pool, project.id, id).await? else {
        return Err(conflict_or_missing(&state, project.id, id, RDO_DRAFT).await);
    };

    state.event_bus.publish(
        DomainEvent::new(event_types::RDO_SUBMITTED)
            .with_source("rdo", rdo.id)
            .with_company(scope.company_id)
            .with_actor(scope.user_id)
            .with_payload(serde_json::json!({
                "project_id": project.id,
                "report_date": rdo.report_date,
            })),
    );

    tracing::info!(rdo_id = rdo.id, "RDO submitted");
    Ok(Json(rdo))
}

/// POST /api/v1/companies/{company_id}/projects/{project_id}/rdos/{id}/approve
///
/// Manager/admin only, only from `submitted`. Publishes `rdo.approved`.
pub async fn approve(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<DecisionRequest>,
) -> AppResult<Json<Rdo>> {
    scope.require_approver()?;
    let project = scope.load_project(&state.pool, project_id).await?;

    let Some(rdo) = RdoRepo::decide(
        &state.pool,
        project.id,
        id,
        scope.user_id,
        true,
        input.note.as_deref(),
    )
    .await?
    else {
        return Err(conflict_or_missing(&state, project.id, id, RDO_SUBMITTED).await);
    };

    state.event_bus.publish(
        DomainEvent::new(event_types::RDO_APPROVED)
            .with_source("rdo", rdo.id)
            .with_company(scope.company_id)
            .with_actor(scope.user_id)
            .with_payload(serde_json::json!({ "report_date": rdo.report_date })),
    );

    tracing::info!(rdo_id = rdo.id, approver = scope.user_id, "RDO approved");
    Ok(Json(rdo))
}

/// POST /api/v1/companies/{company_id}/projects/{project_id}/rdos/{id}/reject
///
/// Manager/admin only, requires a note. Publishes `rdo.rejected`.
pub async fn reject(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<DecisionRequest>,
) -> AppResult<Json<Rdo>> {
    scope.require_approver()?;

    let note = input
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "A rejection requires a note".into(),
            ))
        })?;

    let project = scope.load_project(&state.pool, project_id).await?;

    let Some(rdo) =
        RdoRepo::decide(&state.pool, project.id, id, scope.user_id, false, Some(note)).await?
    else {
        return Err(conflict_or_missing(&state, project.id, id, RDO_SUBMITTED).await);
    };

    state.event_bus.publish(
        DomainEvent::new(event_types::RDO_REJECTED)
            .with_source("rdo", rdo.id)
            .with_company(scope.company_id)
            .with_actor(scope.user_id)
            .with_payload(serde_json::json!({ "note": note })),
    );

    tracing::info!(rdo_id = rdo.id, approver = scope.user_id, "RDO rejected");
    Ok(Json(rdo))
}

/// A conditional transition that matched no row is either a missing report
/// (404) or a report in the wrong state (409). The distinction needs a
/// second lookup, taken only on the error path.
async fn conflict_or_missing(
    state: &AppState,
    project_id: DbId,
    id: DbId,
    required: &'static str,
) -> AppError {
    match RdoRepo::find_by_id(&state.pool, project_id, id).await {
        Ok(Some(rdo)) => AppError::Core(CoreError::Conflict(format!(
            "Report is {}, expected {required}",
            rdo.status
        ))),
        Ok(None) => AppError::Core(CoreError::NotFound { entity: "Rdo", id }),
        Err(e) => AppError::Database(e),
    }
}
