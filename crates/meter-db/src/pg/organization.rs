//! PostgreSQL organization repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use meter_types::OrgId;

use crate::error::DbResult;
use crate::models::OrganizationRow;
use crate::repo::OrganizationRepository;

/// PostgreSQL organization repository
#[derive(Clone)]
pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    /// Create a new organization repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    async fn find_by_id(&self, id: OrgId) -> DbResult<Option<OrganizationRow>> {
        let org = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }
}
