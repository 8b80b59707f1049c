//! Tenant and credential lookups

use std::time::Duration;

use meter_db::{hash_api_key, Storage};
use meter_types::{ApiKeyId, OrgId, Organization};
use tracing::instrument;

use crate::deadline::bounded;
use crate::error::CoreResult;
use crate::trust::Principal;

/// Read-only view over organizations and API keys
#[derive(Clone)]
pub struct IdentityStore {
    storage: Storage,
    timeout: Duration,
}

impl IdentityStore {
    /// Create a new identity store
    pub fn new(storage: Storage, timeout: Duration) -> Self {
        Self { storage, timeout }
    }

    /// Resolve a raw API key to its key ID and organization
    pub async fn resolve(&self, raw_key: &str) -> CoreResult<Option<(ApiKeyId, OrgId)>> {
        let row = bounded(
            self.timeout,
            "find_api_key",
            self.storage.api_keys.find_by_key_hash(&hash_api_key(raw_key)),
        )
        .await?;

        Ok(row.map(|row| (ApiKeyId(row.id), OrgId(row.org_id))))
    }

    /// The principal's organization; `None` if it no longer exists
    #[instrument(skip(self), fields(org_id = %principal.org_id()))]
    pub async fn organization(&self, principal: &Principal) -> CoreResult<Option<Organization>> {
        let row = bounded(
            self.timeout,
            "find_organization",
            self.storage.organizations.find_by_id(principal.org_id()),
        )
        .await?;

        Ok(row.map(Organization::from))
    }
}
