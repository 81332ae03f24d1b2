//! Handlers for the `/companies/{company_id}/projects` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use canteiro_core::error::CoreError;
use canteiro_core::plan::{within_limit, Plan};
use canteiro_core::types::DbId;
use canteiro_db::models::project::{CreateProject, Project, UpdateProject};
use canteiro_db::repositories::{ProjectRepo, SubscriptionRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::scope::CompanyScope;
use crate::state::AppState;

const VALID_STATUSES: &[&str] = &["planning", "active", "paused", "done"];

fn validate_status(status: Option<&str>) -> Result<(), AppError> {
    match status {
        Some(s) if !VALID_STATUSES.contains(&s) => Err(AppError::Core(CoreError::Validation(
            format!("Unknown project status: {s}"),
        ))),
        _ => Ok(()),
    }
}

/// The company's effective plan: the subscription's plan when one exists,
/// free otherwise.
pub async fn effective_plan(state: &AppState, company_id: DbId) -> Result<Plan, AppError> {
    let plan = SubscriptionRepo::find_by_company(&state.pool, company_id)
        .await?
        .and_then(|sub| Plan::parse(&sub.plan))
        .unwrap_or(Plan::Free);
    Ok(plan)
}

/// POST /api/v1/companies/{company_id}/projects
///
/// Creation is gated by the plan's project ceiling.
pub async fn create(
    scope: CompanyScope,
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<Project>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "name must not be empty".into(),
        )));
    }
    validate_status(input.status.as_deref())?;

    let plan = effective_plan(&state, scope.company_id).await?;
    let current = ProjectRepo::count(&state.pool, scope.company_id).await?;
    if !within_limit(plan.max_projects(), current) {
        return Err(AppError::Core(CoreError::PlanLimit(format!(
            "The {} plan allows at most {} projects",
            plan.as_str(),
            plan.max_projects().unwrap_or_default()
        ))));
    }

    let project = ProjectRepo::create(&state.pool, scope.company_id, &input).await?;

    tracing::info!(
        company_id = scope.company_id,
        project_id = project.id,
        "Project created"
    );
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/v1/companies/{company_id}/projects
pub async fn list(
    scope: CompanyScope,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Project>>> {
    let projects = ProjectRepo::list(&state.pool, scope.company_id).await?;
    Ok(Json(projects))
}

/// GET /api/v1/companies/{company_id}/projects/{id}
pub async fn get_by_id(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Project>> {
    let project = scope.load_project(&state.pool, id).await?;
    Ok(Json(project))
}

/// PUT /api/v1/companies/{company_id}/projects/{id}
pub async fn update(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<Project>> {
    validate_status(input.status.as_deref())?;

    let project = ProjectRepo::update(&state.pool, scope.company_id, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;
    Ok(Json(project))
}

/// DELETE /api/v1/companies/{company_id}/projects/{id}
pub async fn delete(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    scope.require_approver()?;

    let deleted = ProjectRepo::soft_delete(&state.pool, scope.company_id, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))
    }
}
