//! Organization and API key types

use serde::{Deserialize, Serialize};

use crate::{ApiKeyId, OrgId};

/// Organization (tenant). Provisioned out of band and never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization ID
    pub id: OrgId,
    /// Display name
    pub name: String,
}

/// API key record. Only the SHA-256 digest of the raw key is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    /// API key ID
    pub id: ApiKeyId,
    /// Organization the key resolves to
    pub org_id: OrgId,
    /// Hex-encoded SHA-256 of the raw key
    pub key_hash: String,
}
