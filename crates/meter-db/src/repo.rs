//! Repository traits
//!
//! Define async repository interfaces for storage operations. Every method that
//! touches tenant data takes the owning `OrgId` explicitly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use meter_types::{InvoiceId, InvoiceStatus, Money, OrgId, UsageEvent};

use crate::error::DbResult;
use crate::models::*;

/// Organization repository trait
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Find an organization by ID
    async fn find_by_id(&self, id: OrgId) -> DbResult<Option<OrganizationRow>>;
}

/// API key repository trait
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Find an API key by the digest of its raw value
    async fn find_by_key_hash(&self, key_hash: &str) -> DbResult<Option<ApiKeyRow>>;
}

/// Usage event repository trait
#[async_trait]
pub trait UsageEventRepository: Send + Sync {
    /// Append an event.
    ///
    /// With an idempotency key, a second insert for the same
    /// `(org_id, idempotency_key)` is ignored. Returns whether a row was written.
    async fn insert(&self, event: &UsageEvent) -> DbResult<bool>;

    /// Sum of quantities for a metric within `[from, to)`
    async fn sum_quantity(
        &self,
        org_id: OrgId,
        metric: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<i64>;
}

/// Usage aggregate repository trait
#[async_trait]
pub trait UsageAggregateRepository: Send + Sync {
    /// Recompute every daily bucket from raw events and upsert the totals.
    ///
    /// Returns the number of buckets inserted or changed. Buckets whose total is
    /// already correct are left untouched.
    async fn recompute_all(&self) -> DbResult<u64>;

    /// Newest buckets for a metric, ordered by `period_start` descending
    async fn find_by_metric(
        &self,
        org_id: OrgId,
        metric: &str,
        limit: i64,
    ) -> DbResult<Vec<UsageAggregateRow>>;

    /// Sum of bucket totals for buckets lying entirely inside `[from, to)`
    async fn sum_within(
        &self,
        org_id: OrgId,
        metric: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<i64>;
}

/// Plan repository trait
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// All plans of an organization
    async fn find_by_org(&self, org_id: OrgId) -> DbResult<Vec<PlanRow>>;
}

/// Invoice repository trait
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert the invoice, or overwrite amount and status if the ID exists.
    ///
    /// `created_at` of an existing row is preserved.
    async fn upsert(&self, invoice: UpsertInvoice) -> DbResult<InvoiceRow>;

    /// Newest invoices of an organization, ordered by `created_at` descending
    async fn find_by_org(&self, org_id: OrgId, limit: i64) -> DbResult<Vec<InvoiceRow>>;
}

/// Upsert invoice input
#[derive(Debug, Clone)]
pub struct UpsertInvoice {
    pub id: InvoiceId,
    pub org_id: OrgId,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_amount: Money,
    pub status: InvoiceStatus,
}

/// Backend liveness probe
#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Round-trip to the backend
    async fn ping(&self) -> DbResult<()>;
}
