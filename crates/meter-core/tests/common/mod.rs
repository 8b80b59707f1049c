//! Common test utilities for meter-core integration tests

pub mod slow_repos;

use std::time::Duration;

use meter_core::{Metering, MeteringApi, MeteringConfig, Principal};
use meter_db::MemoryStore;
use meter_types::{Money, OrgId};

#[allow(unused_imports)]
pub use slow_repos::SlowStore;

/// Amount from a decimal string
#[allow(dead_code)]
pub fn money(amount: &str) -> Money {
    amount.parse().unwrap()
}

/// A seeded tenant
#[allow(dead_code)]
pub struct Tenant {
    pub org_id: OrgId,
    pub api_key: String,
}

/// In-memory store plus the service under test
pub struct Harness {
    pub store: MemoryStore,
    pub metering: Metering,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(MeteringConfig::default())
    }

    pub fn with_config(config: MeteringConfig) -> Self {
        let store = MemoryStore::new();
        let metering = Metering::new(store.storage(), config);
        Self { store, metering }
    }

    /// Key cache disabled
    #[allow(dead_code)]
    pub fn uncached() -> Self {
        Self::with_config(MeteringConfig::default().with_key_cache_ttl(Duration::ZERO))
    }

    /// Provision an organization with one API key
    pub fn tenant(&self, name: &str) -> Tenant {
        let org_id = self.store.insert_organization(name);
        let api_key = format!("sk_test_{name}_{}", org_id.0.simple());
        self.store.insert_api_key(org_id, &api_key);
        Tenant { org_id, api_key }
    }

    /// Authenticate as a tenant
    pub async fn login(&self, tenant: &Tenant) -> Principal {
        self.metering
            .validate_credential(&format!("Bearer {}", tenant.api_key))
            .await
            .unwrap()
    }
}
