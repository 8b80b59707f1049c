//! Credential authentication and the principal it yields
//!
//! A [`Principal`] can only be minted here, after a successful key lookup.
//! It is neither deserializable nor default-constructible, so tenant identity
//! can never be smuggled in from request data.

use std::time::Duration;

use meter_db::hash_api_key;
use meter_types::{ApiKeyId, OrgId};
use moka::future::Cache;
use tracing::{debug, instrument};

use crate::error::{CoreError, CoreResult};
use crate::identity::IdentityStore;
use crate::metrics;

const SCHEMES: [&str; 2] = ["Bearer", "ApiKey"];

/// Pull the API key out of a header value.
///
/// Accepts `Bearer <key>`, `ApiKey <key>` (scheme matched case-insensitively)
/// or the bare key. An unrecognised scheme or an empty remainder leaves the
/// whole trimmed value as the key.
pub fn extract_credential(header_value: &str) -> &str {
    let value = header_value.trim();
    SCHEMES
        .iter()
        .find_map(|scheme| strip_scheme(value, scheme))
        .unwrap_or(value)
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let head = value.get(..scheme.len())?;
    if !head.eq_ignore_ascii_case(scheme) {
        return None;
    }
    let rest = value.get(scheme.len()..)?;
    if !rest.starts_with(|c: char| c.is_ascii_whitespace()) {
        return None;
    }
    let key = rest.trim();
    (!key.is_empty()).then_some(key)
}

/// Authenticated caller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    org_id: OrgId,
    key_id: ApiKeyId,
}

impl Principal {
    pub(crate) fn new(org_id: OrgId, key_id: ApiKeyId) -> Self {
        Self { org_id, key_id }
    }

    /// Organization every scoped operation runs against
    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    /// Key the caller authenticated with
    pub fn key_id(&self) -> ApiKeyId {
        self.key_id
    }
}

/// Turns raw credentials into principals
#[derive(Clone)]
pub struct TrustGateway {
    identity: IdentityStore,
    /// key hash -> principal; positive lookups only
    cache: Option<Cache<String, Principal>>,
}

impl TrustGateway {
    /// Create a gateway; a zero `cache_ttl` disables caching
    pub fn new(identity: IdentityStore, cache_ttl: Duration, cache_capacity: u64) -> Self {
        let cache = (!cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .time_to_live(cache_ttl)
                .max_capacity(cache_capacity)
                .build()
        });
        Self { identity, cache }
    }

    /// Authenticate a credential header value.
    ///
    /// Missing, malformed and unknown keys all yield the same
    /// `CoreError::Unauthenticated`. Storage trouble surfaces as a storage
    /// error so callers can retry.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, credential: &str) -> CoreResult<Principal> {
        let key = extract_credential(credential);
        if key.is_empty() {
            metrics::record_auth_failure();
            debug!("empty credential");
            return Err(CoreError::Unauthenticated);
        }

        let key_hash = hash_api_key(key);
        if let Some(cache) = &self.cache {
            if let Some(principal) = cache.get(&key_hash).await {
                metrics::record_key_cache(true);
                return Ok(principal);
            }
            metrics::record_key_cache(false);
        }

        match self.identity.resolve(key).await? {
            Some((key_id, org_id)) => {
                let principal = Principal::new(org_id, key_id);
                if let Some(cache) = &self.cache {
                    cache.insert(key_hash, principal).await;
                }
                debug!(org_id = %org_id, key_id = %principal.key_id(), "credential accepted");
                Ok(principal)
            }
            None => {
                metrics::record_auth_failure();
                debug!("unknown credential");
                Err(CoreError::Unauthenticated)
            }
        }
    }
}
