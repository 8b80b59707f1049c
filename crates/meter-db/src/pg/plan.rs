//! PostgreSQL plan repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use meter_types::OrgId;

use crate::error::DbResult;
use crate::models::PlanRow;
use crate::repo::PlanRepository;

/// PostgreSQL plan repository
#[derive(Clone)]
pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    /// Create a new plan repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn find_by_org(&self, org_id: OrgId) -> DbResult<Vec<PlanRow>> {
        let plans = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, org_id, name, metric, unit_price, free_quota
            FROM plans
            WHERE org_id = $1
            ORDER BY name, id
            "#,
        )
        .bind(org_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }
}
