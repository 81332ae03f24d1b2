//! Company (tenant root) and membership models.

use canteiro_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A company row from the `companies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub id: DbId,
    pub name: String,
    /// CNPJ or equivalent registration number.
    pub tax_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a company.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub tax_id: Option<String>,
}

/// DTO for updating a company. All fields optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub tax_id: Option<String>,
}

/// A membership row from the `company_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CompanyMember {
    pub id: DbId,
    pub company_id: DbId,
    pub user_id: DbId,
    pub role: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// Membership joined with user identity, for member listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberWithUser {
    pub id: DbId,
    pub user_id: DbId,
    pub role: String,
    pub is_active: bool,
    pub email: String,
    pub full_name: String,
    pub created_at: Timestamp,
}
