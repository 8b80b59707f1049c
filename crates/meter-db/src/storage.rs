//! Storage bundle handed to the core services

use std::sync::Arc;

use crate::pg::Repositories;
use crate::repo::*;
use crate::DbPool;

/// Trait-object view over every repository.
///
/// Services depend on this rather than on a concrete backend so the
/// PostgreSQL and in-process stores are interchangeable.
#[derive(Clone)]
pub struct Storage {
    pub organizations: Arc<dyn OrganizationRepository>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
    pub events: Arc<dyn UsageEventRepository>,
    pub aggregates: Arc<dyn UsageAggregateRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Storage {
    /// PostgreSQL-backed storage sharing one pool
    pub fn postgres(pool: DbPool) -> Self {
        Repositories::new(pool).into()
    }
}

impl From<Repositories> for Storage {
    fn from(repos: Repositories) -> Self {
        Self {
            organizations: Arc::new(repos.organizations),
            api_keys: Arc::new(repos.api_keys),
            events: Arc::new(repos.events),
            aggregates: Arc::new(repos.aggregates),
            plans: Arc::new(repos.plans),
            invoices: Arc::new(repos.invoices),
            health: Arc::new(repos.health),
        }
    }
}
