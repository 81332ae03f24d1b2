//! Tenant-scoping extractors.
//!
//! [`CompanyScope`] is the authorization boundary for everything under
//! `/companies/{company_id}/...`: it authenticates the caller, loads their
//! active membership in the path's company, and hands the handler a proven
//! `(company_id, user_id, role)` triple. Handlers pass `scope.company_id`
//! down to the repositories, which splice it into every `WHERE` clause --
//! a row from another company is unreachable by construction.
//!
//! A caller without a membership gets 403 regardless of whether the
//! company exists, so company ids cannot be probed.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::RequestPartsExt;
use canteiro_core::error::CoreError;
use canteiro_core::roles;
use canteiro_core::types::DbId;
use canteiro_db::repositories::{CompanyRepo, ProjectRepo};
use canteiro_db::models::project::Project;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Authenticated membership in the company named by the request path.
#[derive(Debug, Clone)]
pub struct CompanyScope {
    pub company_id: DbId,
    pub user_id: DbId,
    /// The caller's role in this company (`admin`, `manager`, `member`).
    pub role: String,
}

impl CompanyScope {
    /// Reject with 403 unless the caller may approve daily reports.
    pub fn require_approver(&self) -> Result<(), AppError> {
        if roles::can_approve(&self.role) {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "Manager or admin role required".into(),
            )))
        }
    }

    /// Reject with 403 unless the caller administers the company.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if roles::can_administer(&self.role) {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )))
        }
    }

    /// Resolve the `{project_id}` path segment to a project, verifying it
    /// belongs to this scope's company. A foreign or missing project is 404.
    pub async fn load_project(
        &self,
        pool: &canteiro_db::DbPool,
        project_id: DbId,
    ) -> Result<Project, AppError> {
        ProjectRepo::find_by_id(pool, self.company_id, project_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Project",
                id: project_id,
            }))
    }
}

impl FromRequestParts<AppState> for CompanyScope {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        let params: Path<HashMap<String, String>> = parts.extract().await.map_err(|_| {
            AppError::InternalError("CompanyScope used on a route without path params".into())
        })?;

        let company_id: DbId = params
            .get("company_id")
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| AppError::BadRequest("Invalid company id".into()))?;

        let membership = CompanyRepo::find_membership(&state.pool, company_id, user.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Forbidden(
                    "Not a member of this company".into(),
                ))
            })?;

        Ok(CompanyScope {
            company_id,
            user_id: user.user_id,
            role: membership.role,
        })
    }
}
