//! Repository for the `companies` and `company_members` tables.

use canteiro_core::roles::ROLE_ADMIN;
use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::company::{
    Company, CompanyMember, CreateCompany, MemberWithUser, UpdateCompany,
};

const COMPANY_COLUMNS: &str = "id, name, tax_id, created_at, updated_at";
const MEMBER_COLUMNS: &str = "id, company_id, user_id, role, is_active, created_at";

/// Provides company and membership operations.
pub struct CompanyRepo;

impl CompanyRepo {
    /// Create a company and enroll the creator as its first admin, in a
    /// single transaction.
    pub async fn create_with_admin(
        pool: &PgPool,
        input: &CreateCompany,
        creator_id: DbId,
    ) -> Result<Company, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO companies (name, tax_id) VALUES ($1, $2) RETURNING {COMPANY_COLUMNS}"
        );
        let company = sqlx::query_as::<_, Company>(&query)
            .bind(&input.name)
            .bind(&input.tax_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO company_members (company_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(company.id)
            .bind(creator_id)
            .bind(ROLE_ADMIN)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(company)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Company>, sqlx::Error> {
        let query = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1");
        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Companies the user is an active member of, most recent first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Company>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            "SELECT c.id, c.name, c.tax_id, c.created_at, c.updated_at
             FROM companies c
             JOIN company_members m ON m.company_id = c.id
             WHERE m.user_id = $1 AND m.is_active
             ORDER BY c.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, sqlx::Error> {
        let query = format!(
            "UPDATE companies SET
                name = COALESCE($2, name),
                tax_id = COALESCE($3, tax_id),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COMPANY_COLUMNS}"
        );
        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.tax_id)
            .fetch_optional(pool)
            .await
    }

    // -- Memberships --------------------------------------------------------

    /// Find the caller's active membership in a company. This is the single
    /// query behind the tenant-scoping extractor.
    pub async fn find_membership(
        pool: &PgPool,
        company_id: DbId,
        user_id: DbId,
    ) -> Result<Option<CompanyMember>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM company_members
             WHERE company_id = $1 AND user_id = $2 AND is_active"
        );
        sqlx::query_as::<_, CompanyMember>(&query)
            .bind(company_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List members with user identity, admins first then by join date.
    pub async fn list_members(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<MemberWithUser>, sqlx::Error> {
        sqlx::query_as::<_, MemberWithUser>(
            "SELECT m.id, m.user_id, m.role, m.is_active, u.email, u.full_name, m.created_at
             FROM company_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.company_id = $1
             ORDER BY (m.role = 'admin') DESC, m.created_at",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    pub async fn add_member(
        pool: &PgPool,
        company_id: DbId,
        user_id: DbId,
        role: &str,
    ) -> Result<CompanyMember, sqlx::Error> {
        let query = format!(
            "INSERT INTO company_members (company_id, user_id, role)
             VALUES ($1, $2, $3)
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, CompanyMember>(&query)
            .bind(company_id)
            .bind(user_id)
            .bind(role)
            .fetch_one(pool)
            .await
    }

    pub async fn update_member_role(
        pool: &PgPool,
        company_id: DbId,
        user_id: DbId,
        role: &str,
    ) -> Result<Option<CompanyMember>, sqlx::Error> {
        let query = format!(
            "UPDATE company_members SET role = $3
             WHERE company_id = $1 AND user_id = $2 AND is_active
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, CompanyMember>(&query)
            .bind(company_id)
            .bind(user_id)
            .bind(role)
            .fetch_optional(pool)
            .await
    }

    pub async fn remove_member(
        pool: &PgPool,
        company_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM company_members WHERE company_id = $1 AND user_id = $2")
                .bind(company_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of active admins. Guards the "last admin" invariant before
    /// demotions and removals.
    pub async fn count_admins(pool: &PgPool, company_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM company_members
             WHERE company_id = $1 AND role = 'admin' AND is_active",
        )
        .bind(company_id)
        .fetch_one(pool)
        .await
    }

    /// User ids of all active admins, for notification fan-out.
    pub async fn admin_user_ids(pool: &PgPool, company_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM company_members
             WHERE company_id = $1 AND role = 'admin' AND is_active",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    /// User ids of all active members, for notification fan-out.
    pub async fn member_user_ids(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM company_members WHERE company_id = $1 AND is_active",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }
}
