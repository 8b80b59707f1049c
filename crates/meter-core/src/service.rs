//! Metering capability set
//!
//! [`MeteringApi`] is the full surface the edge needs. [`Metering`] composes
//! every component in-process over one [`Storage`], so tenant identity never
//! leaves the process as a bare ID.

use std::sync::Arc;

use async_trait::async_trait;
use meter_db::Storage;
use meter_types::{BillingPeriod, Invoice, Organization, UsageAggregate};

use crate::aggregate::{AggregationReport, Aggregator};
use crate::billing::BillingEngine;
use crate::config::MeteringConfig;
use crate::deadline::bounded;
use crate::error::CoreResult;
use crate::identity::IdentityStore;
use crate::ingest::{RecordOutcome, UsageIngestor, UsageRecord};
use crate::trust::{Principal, TrustGateway};

/// Operations offered to authenticated callers
#[async_trait]
pub trait MeteringApi: Send + Sync {
    /// Authenticate a credential header value
    async fn validate_credential(&self, credential: &str) -> CoreResult<Principal>;

    /// The principal's organization
    async fn organization(&self, principal: &Principal) -> CoreResult<Option<Organization>>;

    /// Newest daily aggregates for a metric (at most 30)
    async fn usage_summary(
        &self,
        principal: &Principal,
        metric: &str,
    ) -> CoreResult<Vec<UsageAggregate>>;

    /// Record usage
    async fn record_usage(
        &self,
        principal: &Principal,
        record: UsageRecord,
    ) -> CoreResult<RecordOutcome>;

    /// Compute and store the invoice for a period
    async fn generate_invoice(
        &self,
        principal: &Principal,
        period: BillingPeriod,
    ) -> CoreResult<Invoice>;

    /// Newest invoices (at most 50)
    async fn list_invoices(&self, principal: &Principal) -> CoreResult<Vec<Invoice>>;

    /// Recompute all usage aggregates
    async fn aggregate_all(&self) -> CoreResult<AggregationReport>;

    /// Backend round-trip for readiness probes
    async fn ping(&self) -> CoreResult<()>;
}

/// In-process implementation of [`MeteringApi`]
#[derive(Clone)]
pub struct Metering {
    storage: Storage,
    config: MeteringConfig,
    gateway: TrustGateway,
    identity: IdentityStore,
    ingestor: UsageIngestor,
    aggregator: Aggregator,
    billing: BillingEngine,
}

impl Metering {
    /// Wire every component to `storage`
    pub fn new(storage: Storage, config: MeteringConfig) -> Self {
        let identity = IdentityStore::new(storage.clone(), config.storage_timeout);
        Self {
            gateway: TrustGateway::new(
                identity.clone(),
                config.key_cache_ttl,
                config.key_cache_capacity,
            ),
            ingestor: UsageIngestor::new(storage.clone(), config.storage_timeout),
            aggregator: Aggregator::new(storage.clone(), config.aggregation_timeout),
            billing: BillingEngine::new(
                storage.clone(),
                config.storage_timeout,
                config.usage_source,
            ),
            identity,
            storage,
            config,
        }
    }

    /// Shared handle, as the edge consumes it
    pub fn shared(storage: Storage, config: MeteringConfig) -> Arc<dyn MeteringApi> {
        Arc::new(Self::new(storage, config))
    }

    /// Aggregator for hosting the periodic run loop
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }
}

#[async_trait]
impl MeteringApi for Metering {
    async fn validate_credential(&self, credential: &str) -> CoreResult<Principal> {
        self.gateway.authenticate(credential).await
    }

    async fn organization(&self, principal: &Principal) -> CoreResult<Option<Organization>> {
        self.identity.organization(principal).await
    }

    async fn usage_summary(
        &self,
        principal: &Principal,
        metric: &str,
    ) -> CoreResult<Vec<UsageAggregate>> {
        self.ingestor.summary(principal, metric).await
    }

    async fn record_usage(
        &self,
        principal: &Principal,
        record: UsageRecord,
    ) -> CoreResult<RecordOutcome> {
        self.ingestor.record(principal, record).await
    }

    async fn generate_invoice(
        &self,
        principal: &Principal,
        period: BillingPeriod,
    ) -> CoreResult<Invoice> {
        self.billing.generate_invoice(principal, period).await
    }

    async fn list_invoices(&self, principal: &Principal) -> CoreResult<Vec<Invoice>> {
        self.billing.list_invoices(principal).await
    }

    async fn aggregate_all(&self) -> CoreResult<AggregationReport> {
        self.aggregator.aggregate_all().await
    }

    async fn ping(&self) -> CoreResult<()> {
        bounded(self.config.storage_timeout, "ping", self.storage.health.ping()).await
    }
}
