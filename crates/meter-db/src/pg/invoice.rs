//! PostgreSQL invoice repository implementation

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use meter_types::OrgId;

use crate::error::{DbError, DbResult};
use crate::models::InvoiceRow;
use crate::repo::{InvoiceRepository, UpsertInvoice};

/// PostgreSQL invoice repository
#[derive(Clone)]
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    /// Create a new invoice repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn upsert(&self, invoice: UpsertInvoice) -> DbResult<InvoiceRow> {
        // The WHERE guard keeps a colliding ID from rewriting another tenant's row.
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            INSERT INTO invoices (id, org_id, period_start, period_end, total_amount, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id)
            DO UPDATE SET total_amount = EXCLUDED.total_amount, status = EXCLUDED.status
            WHERE invoices.org_id = EXCLUDED.org_id
            RETURNING id, org_id, period_start, period_end, total_amount, status, created_at
            "#,
        )
        .bind(invoice.id.0)
        .bind(invoice.org_id.0)
        .bind(invoice.period_start)
        .bind(invoice.period_end)
        .bind(Decimal::from(invoice.total_amount))
        .bind(invoice.status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| {
            DbError::InvalidData(format!(
                "invoice {} belongs to another organization",
                invoice.id
            ))
        })
    }

    async fn find_by_org(&self, org_id: OrgId, limit: i64) -> DbResult<Vec<InvoiceRow>> {
        let invoices = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, org_id, period_start, period_end, total_amount, status, created_at
            FROM invoices
            WHERE org_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(org_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }
}
