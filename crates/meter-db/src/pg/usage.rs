//! PostgreSQL usage event repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use meter_types::{OrgId, UsageEvent};

use crate::error::DbResult;
use crate::repo::UsageEventRepository;

/// PostgreSQL usage event repository
#[derive(Clone)]
pub struct PgUsageEventRepository {
    pool: PgPool,
}

impl PgUsageEventRepository {
    /// Create a new usage event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageEventRepository for PgUsageEventRepository {
    async fn insert(&self, event: &UsageEvent) -> DbResult<bool> {
        // Rows without a key never hit the partial unique index.
        let result = sqlx::query(
            r#"
            INSERT INTO usage_events (org_id, metric, quantity, occurred_at, idempotency_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (org_id, idempotency_key) WHERE idempotency_key IS NOT NULL
            DO NOTHING
            "#,
        )
        .bind(event.org_id.0)
        .bind(&event.metric)
        .bind(event.quantity)
        .bind(event.occurred_at)
        .bind(&event.idempotency_key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn sum_quantity(
        &self,
        org_id: OrgId,
        metric: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT
            FROM usage_events
            WHERE org_id = $1 AND metric = $2
              AND occurred_at >= $3 AND occurred_at < $4
            "#,
        )
        .bind(org_id.0)
        .bind(metric)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
