//! Storage doubles that stall, for deadline tests

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meter_db::{DbResult, MemoryStore, Storage, UsageEventRepository};
use meter_types::{OrgId, UsageEvent};
use std::sync::Arc;

/// Event repository that sleeps before delegating
#[derive(Clone)]
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: MemoryStore, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// `inner`'s storage with the event repository replaced by this one
    #[allow(dead_code)]
    pub fn storage(&self) -> Storage {
        Storage {
            events: Arc::new(self.clone()),
            ..self.inner.storage()
        }
    }
}

#[async_trait]
impl UsageEventRepository for SlowStore {
    async fn insert(&self, event: &UsageEvent) -> DbResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert(event).await
    }

    async fn sum_quantity(
        &self,
        org_id: OrgId,
        metric: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<i64> {
        tokio::time::sleep(self.delay).await;
        self.inner.sum_quantity(org_id, metric, from, to).await
    }
}
