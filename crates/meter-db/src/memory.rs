//! In-process storage backend
//!
//! Implements every repository trait over `DashMap`s. Used by tests and local
//! runs without PostgreSQL; semantics follow the SQL implementations, including
//! keyed-insert deduplication and the no-op upsert of unchanged aggregates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::warn;
use uuid::Uuid;

use meter_types::{ApiKeyId, DayBucket, Money, OrgId, PlanId, UsageEvent};

use crate::error::{DbError, DbResult};
use crate::hash::hash_api_key;
use crate::models::*;
use crate::repo::*;
use crate::storage::Storage;

type BucketKey = (OrgId, String, DateTime<Utc>);

#[derive(Default)]
struct Inner {
    organizations: DashMap<OrgId, OrganizationRow>,
    api_keys: DashMap<String, ApiKeyRow>,
    events: DashMap<OrgId, Vec<UsageEvent>>,
    idempotency: DashMap<(OrgId, String), ()>,
    aggregates: DashMap<BucketKey, UsageAggregateRow>,
    plans: DashMap<OrgId, Vec<PlanRow>>,
    invoices: DashMap<Uuid, (u64, InvoiceRow)>,
    seq: AtomicU64,
    unavailable: AtomicBool,
}

/// Shared in-memory store; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage bundle backed by this store
    pub fn storage(&self) -> Storage {
        Storage {
            organizations: Arc::new(self.clone()),
            api_keys: Arc::new(self.clone()),
            events: Arc::new(self.clone()),
            aggregates: Arc::new(self.clone()),
            plans: Arc::new(self.clone()),
            invoices: Arc::new(self.clone()),
            health: Arc::new(self.clone()),
        }
    }

    /// Make every subsequent call fail with `DbError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Provision an organization
    pub fn insert_organization(&self, name: &str) -> OrgId {
        let id = OrgId::new();
        self.inner.organizations.insert(
            id,
            OrganizationRow {
                id: id.0,
                name: name.to_string(),
            },
        );
        id
    }

    /// Provision an API key; only its digest is kept
    pub fn insert_api_key(&self, org_id: OrgId, raw_key: &str) -> ApiKeyId {
        let id = ApiKeyId::new();
        let key_hash = hash_api_key(raw_key);
        self.inner.api_keys.insert(
            key_hash.clone(),
            ApiKeyRow {
                id: id.0,
                org_id: org_id.0,
                key_hash,
            },
        );
        id
    }

    /// Remove an API key by its raw value
    pub fn revoke_api_key(&self, raw_key: &str) {
        self.inner.api_keys.remove(&hash_api_key(raw_key));
    }

    /// Attach a plan to an organization
    pub fn insert_plan(
        &self,
        org_id: OrgId,
        name: &str,
        metric: &str,
        unit_price: Money,
        free_quota: i64,
    ) -> PlanId {
        let id = PlanId::new();
        self.inner.plans.entry(org_id).or_default().push(PlanRow {
            id: id.0,
            org_id: org_id.0,
            name: name.to_string(),
            metric: metric.to_string(),
            unit_price: unit_price.into(),
            free_quota,
        });
        id
    }

    /// Number of stored events across all organizations
    pub fn event_count(&self) -> usize {
        self.inner.events.iter().map(|e| e.value().len()).sum()
    }

    /// Every aggregate row of an organization, oldest bucket first
    pub fn aggregates_of(&self, org_id: OrgId) -> Vec<UsageAggregateRow> {
        let mut rows: Vec<_> = self
            .inner
            .aggregates
            .iter()
            .filter(|e| e.key().0 == org_id)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| {
            a.period_start
                .cmp(&b.period_start)
                .then_with(|| a.metric.cmp(&b.metric))
        });
        rows
    }

    fn check(&self) -> DbResult<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn next_seq(&self) -> u64 {
        self.inner.seq.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl OrganizationRepository for MemoryStore {
    async fn find_by_id(&self, id: OrgId) -> DbResult<Option<OrganizationRow>> {
        self.check()?;
        Ok(self.inner.organizations.get(&id).map(|r| r.value().clone()))
    }
}

#[async_trait]
impl ApiKeyRepository for MemoryStore {
    async fn find_by_key_hash(&self, key_hash: &str) -> DbResult<Option<ApiKeyRow>> {
        self.check()?;
        Ok(self.inner.api_keys.get(key_hash).map(|r| r.value().clone()))
    }
}

#[async_trait]
impl UsageEventRepository for MemoryStore {
    async fn insert(&self, event: &UsageEvent) -> DbResult<bool> {
        self.check()?;
        if let Some(key) = &event.idempotency_key {
            match self.inner.idempotency.entry((event.org_id, key.clone())) {
                Entry::Occupied(_) => return Ok(false),
                Entry::Vacant(slot) => {
                    slot.insert(());
                }
            }
        }
        self.inner
            .events
            .entry(event.org_id)
            .or_default()
            .push(event.clone());
        Ok(true)
    }

    async fn sum_quantity(
        &self,
        org_id: OrgId,
        metric: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<i64> {
        self.check()?;
        let total = self.inner.events.get(&org_id).map_or(Some(0), |events| {
            events
                .iter()
                .filter(|e| e.metric == metric && e.occurred_at >= from && e.occurred_at < to)
                .try_fold(0i64, |acc, e| acc.checked_add(e.quantity))
        });
        total.ok_or_else(|| DbError::InvalidData("usage total out of range".to_string()))
    }
}

#[async_trait]
impl UsageAggregateRepository for MemoryStore {
    async fn recompute_all(&self) -> DbResult<u64> {
        self.check()?;

        // `None` marks a bucket whose sum left the i64 range
        let mut totals: HashMap<BucketKey, (DayBucket, Option<i64>)> = HashMap::new();
        for entry in self.inner.events.iter() {
            for event in entry.value() {
                let bucket = DayBucket::containing(event.occurred_at);
                let slot = totals
                    .entry((event.org_id, event.metric.clone(), bucket.start))
                    .or_insert((bucket, Some(0)));
                slot.1 = slot.1.and_then(|total| total.checked_add(event.quantity));
            }
        }

        let now = Utc::now();
        let mut changed = 0;
        for (key, (bucket, total)) in totals {
            let Some(total) = total else {
                warn!(
                    org_id = %key.0,
                    metric = %key.1,
                    day = %bucket.start.date_naive(),
                    "usage bucket exceeds i64, aggregate not written"
                );
                continue;
            };
            match self.inner.aggregates.entry(key) {
                Entry::Occupied(mut slot) => {
                    let row = slot.get_mut();
                    if row.total != total {
                        row.total = total;
                        row.updated_at = now;
                        changed += 1;
                    }
                }
                Entry::Vacant(slot) => {
                    let (org_id, metric, _) = slot.key().clone();
                    slot.insert(UsageAggregateRow {
                        org_id: org_id.0,
                        metric,
                        period_start: bucket.start,
                        period_end: bucket.end,
                        total,
                        updated_at: now,
                    });
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn find_by_metric(
        &self,
        org_id: OrgId,
        metric: &str,
        limit: i64,
    ) -> DbResult<Vec<UsageAggregateRow>> {
        self.check()?;
        let mut rows: Vec<_> = self
            .inner
            .aggregates
            .iter()
            .filter(|e| e.key().0 == org_id && e.key().1 == metric)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| b.period_start.cmp(&a.period_start));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn sum_within(
        &self,
        org_id: OrgId,
        metric: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<i64> {
        self.check()?;
        self.inner
            .aggregates
            .iter()
            .filter(|e| e.key().0 == org_id && e.key().1 == metric)
            .filter(|e| DayBucket::containing(e.value().period_start).within(from, to))
            .try_fold(0i64, |acc, e| acc.checked_add(e.value().total))
            .ok_or_else(|| DbError::InvalidData("usage total out of range".to_string()))
    }
}

#[async_trait]
impl PlanRepository for MemoryStore {
    async fn find_by_org(&self, org_id: OrgId) -> DbResult<Vec<PlanRow>> {
        self.check()?;
        let mut plans = self
            .inner
            .plans
            .get(&org_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        plans.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(plans)
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn upsert(&self, invoice: UpsertInvoice) -> DbResult<InvoiceRow> {
        self.check()?;
        match self.inner.invoices.entry(invoice.id.0) {
            Entry::Occupied(mut slot) => {
                let (_, row) = slot.get_mut();
                if row.org_id != invoice.org_id.0 {
                    return Err(DbError::InvalidData(format!(
                        "invoice {} belongs to another organization",
                        invoice.id
                    )));
                }
                row.total_amount = invoice.total_amount.into();
                row.status = invoice.status.as_str().to_string();
                Ok(row.clone())
            }
            Entry::Vacant(slot) => {
                let row = InvoiceRow {
                    id: invoice.id.0,
                    org_id: invoice.org_id.0,
                    period_start: invoice.period_start,
                    period_end: invoice.period_end,
                    total_amount: invoice.total_amount.into(),
                    status: invoice.status.as_str().to_string(),
                    created_at: Utc::now(),
                };
                slot.insert((self.next_seq(), row.clone()));
                Ok(row)
            }
        }
    }

    async fn find_by_org(&self, org_id: OrgId, limit: i64) -> DbResult<Vec<InvoiceRow>> {
        self.check()?;
        let mut rows: Vec<_> = self
            .inner
            .invoices
            .iter()
            .filter(|e| e.value().1.org_id == org_id.0)
            .map(|e| e.value().clone())
            .collect();
        // Insertion order breaks created_at ties.
        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });
        Ok(rows
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|(_, row)| row)
            .collect())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> DbResult<()> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(org_id: OrgId, quantity: i64, key: Option<&str>) -> UsageEvent {
        UsageEvent {
            org_id,
            metric: "api_calls".to_string(),
            quantity,
            occurred_at: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
            idempotency_key: key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_keyed_insert_is_deduplicated_per_org() {
        let store = MemoryStore::new();
        let a = store.insert_organization("a");
        let b = store.insert_organization("b");

        assert!(store.insert(&event(a, 5, Some("k1"))).await.unwrap());
        assert!(!store.insert(&event(a, 5, Some("k1"))).await.unwrap());
        assert!(store.insert(&event(b, 5, Some("k1"))).await.unwrap());
        assert_eq!(store.event_count(), 2);
    }

    #[tokio::test]
    async fn test_unkeyed_inserts_always_append() {
        let store = MemoryStore::new();
        let org = store.insert_organization("a");

        assert!(store.insert(&event(org, 1, None)).await.unwrap());
        assert!(store.insert(&event(org, 1, None)).await.unwrap());
        assert_eq!(store.event_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        let org = store.insert_organization("a");
        store.set_unavailable(true);

        assert!(matches!(
            OrganizationRepository::find_by_id(&store, org).await,
            Err(DbError::Unavailable(_))
        ));
        assert!(store.ping().await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
