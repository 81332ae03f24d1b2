//! Handlers for `/companies/{company_id}/projects/{project_id}/incidents`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use canteiro_core::error::CoreError;
use canteiro_core::types::DbId;
use canteiro_db::models::incident::{CreateIncident, Incident, UpdateIncident};
use canteiro_db::repositories::IncidentRepo;
use canteiro_events::bus::event_types;
use canteiro_events::DomainEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::scope::CompanyScope;
use crate::state::AppState;

const VALID_SEVERITIES: &[&str] = &["low", "medium", "high", "critical"];
const VALID_STATUSES: &[&str] = &["open", "investigating", "resolved"];

fn validate_severity(severity: &str) -> Result<(), AppError> {
    if VALID_SEVERITIES.contains(&severity) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Validation(format!(
            "Unknown severity: {severity}"
        ))))
    }
}

/// POST /api/v1/companies/{company_id}/projects/{project_id}/incidents
///
/// Publishes `incident.reported`.
pub async fn create(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id)): Path<(DbId, DbId)>,
    Json(input): Json<CreateIncident>,
) -> AppResult<(StatusCode, Json<Incident>)> {
    if input.title.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "title must not be empty".into(),
        )));
    }
    validate_severity(&input.severity)?;

    let project = scope.load_project(&state.pool, project_id).await?;
    let incident = IncidentRepo::create(&state.pool, project.id, scope.user_id, &input).await?;

    state.event_bus.publish(
        DomainEvent::new(event_types::INCIDENT_REPORTED)
            .with_source("incident", incident.id)
            .with_company(scope.company_id)
            .with_actor(scope.user_id)
            .with_payload(serde_json::json!({
                "title": incident.title,
                "severity": incident.severity,
            })),
    );

    tracing::info!(
        project_id = project.id,
        incident_id = incident.id,
        severity = %incident.severity,
        "Incident reported"
    );
    Ok((StatusCode::CREATED, Json(incident)))
}

/// GET /api/v1/companies/{company_id}/projects/{project_id}/incidents
pub async fn list(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<Vec<Incident>>> {
    let project = scope.load_project(&state.pool, project_id).await?;
    let incidents = IncidentRepo::list(&state.pool, project.id).await?;
    Ok(Json(incidents))
}

/// GET /api/v1/companies/{company_id}/projects/{project_id}/incidents/{id}
pub async fn get_by_id(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<Json<Incident>> {
    let project = scope.load_project(&state.pool, project_id).await?;
    let incident = IncidentRepo::find_by_id(&state.pool, project.id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Incident",
            id,
        }))?;
    Ok(Json(incident))
}

/// PUT /api/v1/companies/{company_id}/projects/{project_id}/incidents/{id}
pub async fn update(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<UpdateIncident>,
) -> AppResult<Json<Incident>> {
    if let Some(severity) = input.severity.as_deref() {
        validate_severity(severity)?;
    }
    if let Some(status) = input.status.as_deref() {
        if !VALID_STATUSES.contains(&status) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown status: {status}"
            ))));
        }
    }

    let project = scope.load_project(&state.pool, project_id).await?;
    let incident = IncidentRepo::update(&state.pool, project.id, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Incident",
            id,
        }))?;
    Ok(Json(incident))
}

/// POST /api/v1/companies/{company_id}/projects/{project_id}/incidents/{id}/resolve
///
/// Publishes `incident.resolved`. Resolving an already-resolved incident is
/// a conflict.
pub async fn resolve(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<Json<Incident>> {
    let project = scope.load_project(&state.pool, project_id).await?;

    let Some(incident) = IncidentRepo::resolve(&state.pool, project.id, id).await? else {
        return match IncidentRepo::find_by_id(&state.pool, project.id, id).await? {
            Some(_) => Err(AppError::Core(CoreError::Conflict(
                "Incident is already resolved".into(),
            ))),
            None => Err(AppError::Core(CoreError::NotFound {
                entity: "Incident",
                id,
            })),
        };
    };

    state.event_bus.publish(
        DomainEvent::new(event_types::INCIDENT_RESOLVED)
            .with_source("incident", incident.id)
            .with_company(scope.company_id)
            .with_actor(scope.user_id),
    );

    tracing::info!(incident_id = incident.id, "Incident resolved");
    Ok(Json(incident))
}

/// DELETE /api/v1/companies/{company_id}/projects/{project_id}/incidents/{id}
pub async fn delete(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, project_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<StatusCode> {
    scope.require_approver()?;

    let project = scope.load_project(&state.pool, project_id).await?;
    let deleted = IncidentRepo::delete(&state.pool, project.id, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Incident",
            id,
        }))
    }
}
