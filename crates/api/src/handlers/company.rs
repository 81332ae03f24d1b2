//! Handlers for the `/companies` resource and its memberships.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use canteiro_core::error::CoreError;
use canteiro_core::roles::{ROLE_ADMIN, ROLE_MANAGER, ROLE_MEMBER};
use canteiro_core::types::DbId;
use canteiro_db::models::company::{Company, CreateCompany, UpdateCompany};
use canteiro_db::repositories::{CompanyRepo, UserRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::scope::CompanyScope;
use crate::response::DataResponse;
use crate::state::AppState;

fn valid_role(role: &str) -> bool {
    matches!(role, ROLE_ADMIN | ROLE_MANAGER | ROLE_MEMBER)
}

/// POST /api/v1/companies
///
/// Create a company; the caller becomes its first admin.
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCompany>,
) -> AppResult<(StatusCode, Json<Company>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "name must not be empty".into(),
        )));
    }

    let company = CompanyRepo::create_with_admin(&state.pool, &input, auth.user_id).await?;

    tracing::info!(company_id = company.id, user_id = auth.user_id, "Company created");
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /api/v1/companies
///
/// Companies the caller belongs to.
pub async fn list(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<Company>>> {
    let companies = CompanyRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(companies))
}

/// GET /api/v1/companies/{company_id}
pub async fn get_by_id(
    scope: CompanyScope,
    State(state): State<AppState>,
) -> AppResult<Json<Company>> {
    let company = CompanyRepo::find_by_id(&state.pool, scope.company_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Company",
            id: scope.company_id,
        }))?;
    Ok(Json(company))
}

/// PUT /api/v1/companies/{company_id}
pub async fn update(
    scope: CompanyScope,
    State(state): State<AppState>,
    Json(input): Json<UpdateCompany>,
) -> AppResult<Json<Company>> {
    scope.require_admin()?;

    let company = CompanyRepo::update(&state.pool, scope.company_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Company",
            id: scope.company_id,
        }))?;
    Ok(Json(company))
}

// ---------------------------------------------------------------------------
// Memberships
// ---------------------------------------------------------------------------

/// Request body for `POST /companies/{company_id}/members`.
#[derive(Debug, Deserialize)]
pub struct InviteMemberRequest {
    /// Email of an existing user account.
    pub email: String,
    pub role: String,
}

/// Request body for `PUT /companies/{company_id}/members/{user_id}`.
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

/// GET /api/v1/companies/{company_id}/members
pub async fn list_members(
    scope: CompanyScope,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let members = CompanyRepo::list_members(&state.pool, scope.company_id).await?;
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/companies/{company_id}/members
///
/// Add an existing user to the company (admin only). Duplicate membership
/// maps to 409 via `uq_company_members_company_user`.
pub async fn invite_member(
    scope: CompanyScope,
    State(state): State<AppState>,
    Json(input): Json<InviteMemberRequest>,
) -> AppResult<impl IntoResponse> {
    scope.require_admin()?;

    if !valid_role(&input.role) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role: {}",
            input.role
        ))));
    }

    let user = UserRepo::find_by_email(&state.pool, &input.email.trim().to_lowercase())
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "No account exists for that email".into(),
            ))
        })?;

    let member =
        CompanyRepo::add_member(&state.pool, scope.company_id, user.id, &input.role).await?;

    tracing::info!(
        company_id = scope.company_id,
        user_id = user.id,
        role = %input.role,
        "Member added"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: member })))
}

/// PUT /api/v1/companies/{company_id}/members/{user_id}
///
/// Change a member's role (admin only). The last admin cannot be demoted.
pub async fn change_member_role(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, target_user_id)): Path<(DbId, DbId)>,
    Json(input): Json<ChangeRoleRequest>,
) -> AppResult<impl IntoResponse> {
    scope.require_admin()?;

    if !valid_role(&input.role) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role: {}",
            input.role
        ))));
    }

    ensure_not_last_admin(&state, &scope, target_user_id, &input.role).await?;

    let member =
        CompanyRepo::update_member_role(&state.pool, scope.company_id, target_user_id, &input.role)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Member",
                id: target_user_id,
            }))?;

    Ok(Json(DataResponse { data: member }))
}

/// DELETE /api/v1/companies/{company_id}/members/{user_id}
///
/// Remove a member (admin only). The last admin cannot be removed.
pub async fn remove_member(
    scope: CompanyScope,
    State(state): State<AppState>,
    Path((_, target_user_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    scope.require_admin()?;

    ensure_not_last_admin(&state, &scope, target_user_id, ROLE_MEMBER).await?;

    let removed = CompanyRepo::remove_member(&state.pool, scope.company_id, target_user_id).await?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Member",
            id: target_user_id,
        }))
    }
}

/// Reject the operation when it would leave the company without an admin:
/// the target currently holds the admin role, is the only one, and the new
/// role is not admin.
async fn ensure_not_last_admin(
    state: &AppState,
    scope: &CompanyScope,
    target_user_id: DbId,
    new_role: &str,
) -> Result<(), AppError> {
    if new_role == ROLE_ADMIN {
        return Ok(());
    }
    let target = CompanyRepo::find_membership(&state.pool, scope.company_id, target_user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Member",
            id: target_user_id,
        }))?;

    if target.role == ROLE_ADMIN
        && CompanyRepo::count_admins(&state.pool, scope.company_id).await? <= 1
    {
        return Err(AppError::Core(CoreError::Conflict(
            "A company must keep at least one admin".into(),
        )));
    }
    Ok(())
}
