//! PostgreSQL repository implementations

mod aggregate;
mod api_key;
mod health;
mod invoice;
mod organization;
mod plan;
mod usage;

pub use aggregate::PgUsageAggregateRepository;
pub use api_key::PgApiKeyRepository;
pub use health::PgStoreHealth;
pub use invoice::PgInvoiceRepository;
pub use organization::PgOrganizationRepository;
pub use plan::PgPlanRepository;
pub use usage::PgUsageEventRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub organizations: PgOrganizationRepository,
    pub api_keys: PgApiKeyRepository,
    pub events: PgUsageEventRepository,
    pub aggregates: PgUsageAggregateRepository,
    pub plans: PgPlanRepository,
    pub invoices: PgInvoiceRepository,
    pub health: PgStoreHealth,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            organizations: PgOrganizationRepository::new(pool.clone()),
            api_keys: PgApiKeyRepository::new(pool.clone()),
            events: PgUsageEventRepository::new(pool.clone()),
            aggregates: PgUsageAggregateRepository::new(pool.clone()),
            plans: PgPlanRepository::new(pool.clone()),
            invoices: PgInvoiceRepository::new(pool.clone()),
            health: PgStoreHealth::new(pool),
        }
    }
}
