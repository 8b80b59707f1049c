//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use meter_types::{
    ApiKey, ApiKeyId, Invoice, InvoiceId, InvoiceStatus, Money, OrgId, Organization, Plan, PlanId,
    UsageAggregate,
};

use crate::error::DbError;

/// Organization row from the database
#[derive(Debug, Clone, FromRow)]
pub struct OrganizationRow {
    pub id: Uuid,
    pub name: String,
}

/// API key row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub key_hash: String,
}

/// Usage aggregate row from the database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UsageAggregateRow {
    pub org_id: Uuid,
    pub metric: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total: i64,
    pub updated_at: DateTime<Utc>,
}

/// Plan row from the database
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub metric: String,
    pub unit_price: Decimal,
    pub free_quota: i64,
}

/// Invoice row from the database
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// Conversion implementations from Row types to meter-types domain types
impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Self {
            id: OrgId(row.id),
            name: row.name,
        }
    }
}

impl From<ApiKeyRow> for ApiKey {
    fn from(row: ApiKeyRow) -> Self {
        Self {
            id: ApiKeyId(row.id),
            org_id: OrgId(row.org_id),
            key_hash: row.key_hash,
        }
    }
}

impl From<UsageAggregateRow> for UsageAggregate {
    fn from(row: UsageAggregateRow) -> Self {
        Self {
            org_id: OrgId(row.org_id),
            metric: row.metric,
            period_start: row.period_start,
            period_end: row.period_end,
            total: row.total,
        }
    }
}

impl TryFrom<PlanRow> for Plan {
    type Error = DbError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PlanId(row.id),
            org_id: OrgId(row.org_id),
            name: row.name,
            metric: row.metric,
            unit_price: Money::from_decimal(row.unit_price)?,
            free_quota: row.free_quota,
        })
    }
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: InvoiceId(row.id),
            org_id: OrgId(row.org_id),
            period_start: row.period_start,
            period_end: row.period_end,
            total_amount: Money::from_decimal(row.total_amount)?,
            status: row.status.parse::<InvoiceStatus>()?,
            created_at: row.created_at,
        })
    }
}
