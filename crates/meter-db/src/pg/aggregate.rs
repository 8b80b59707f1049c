//! PostgreSQL usage aggregate repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use meter_types::OrgId;

use crate::error::DbResult;
use crate::models::UsageAggregateRow;
use crate::repo::UsageAggregateRepository;

/// PostgreSQL usage aggregate repository
#[derive(Clone)]
pub struct PgUsageAggregateRepository {
    pool: PgPool,
}

impl PgUsageAggregateRepository {
    /// Create a new usage aggregate repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageAggregateRepository for PgUsageAggregateRepository {
    async fn recompute_all(&self) -> DbResult<u64> {
        // One statement: concurrent runs serialize on the bucket constraint and
        // converge to the same totals. Sums are taken as NUMERIC; a bucket that
        // does not fit a BIGINT is left out and reported instead of failing
        // the run for every organization.
        let (upserted, oversized): (i64, Vec<String>) = sqlx::query_as(
            r#"
            WITH sums AS (
                SELECT org_id,
                       metric,
                       day,
                       SUM(quantity)::NUMERIC AS total
                FROM (
                    SELECT org_id, metric, quantity,
                           date_trunc('day', occurred_at AT TIME ZONE 'UTC') AT TIME ZONE 'UTC' AS day
                    FROM usage_events
                ) AS bucketed
                GROUP BY org_id, metric, day
            ),
            written AS (
                INSERT INTO usage_aggregates (org_id, metric, period_start, period_end, total)
                SELECT org_id, metric, day, day + INTERVAL '24 hours', total::BIGINT
                FROM sums
                WHERE total <= 9223372036854775807
                ON CONFLICT ON CONSTRAINT uq_usage_aggregates_bucket
                DO UPDATE SET total = EXCLUDED.total, updated_at = NOW()
                WHERE usage_aggregates.total IS DISTINCT FROM EXCLUDED.total
                RETURNING 1
            )
            SELECT (SELECT COUNT(*) FROM written) AS upserted,
                   ARRAY(
                       SELECT org_id::TEXT || ' ' || metric || ' ' || to_char(day, 'YYYY-MM-DD')
                       FROM sums
                       WHERE total > 9223372036854775807
                   ) AS oversized
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        for bucket in &oversized {
            warn!(bucket = %bucket, "usage bucket exceeds BIGINT, aggregate not written");
        }

        Ok(u64::try_from(upserted).unwrap_or(0))
    }

    async fn find_by_metric(
        &self,
        org_id: OrgId,
        metric: &str,
        limit: i64,
    ) -> DbResult<Vec<UsageAggregateRow>> {
        let rows = sqlx::query_as::<_, UsageAggregateRow>(
            r#"
            SELECT org_id, metric, period_start, period_end, total, updated_at
            FROM usage_aggregates
            WHERE org_id = $1 AND metric = $2
            ORDER BY period_start DESC
            LIMIT $3
            "#,
        )
        .bind(org_id.0)
        .bind(metric)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn sum_within(
        &self,
        org_id: OrgId,
        metric: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total), 0)::BIGINT
            FROM usage_aggregates
            WHERE org_id = $1 AND metric = $2
              AND period_start >= $3 AND period_end <= $4
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
