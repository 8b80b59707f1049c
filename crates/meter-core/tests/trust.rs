//! Credential authentication through the trust gateway

mod common;

use std::time::Duration;

use common::Harness;
use meter_core::{CoreError, IdentityStore, MeteringApi};

#[tokio::test]
async fn accepts_every_credential_form() {
    let h = Harness::new();
    let tenant = h.tenant("acme");

    for credential in [
        format!("Bearer {}", tenant.api_key),
        format!("ApiKey {}", tenant.api_key),
        tenant.api_key.clone(),
    ] {
        let principal = h.metering.validate_credential(&credential).await.unwrap();
        assert_eq!(principal.org_id(), tenant.org_id);
    }
}

#[tokio::test]
async fn principal_carries_the_presented_key() {
    let h = Harness::new();
    let org_id = h.store.insert_organization("acme");
    let key_id = h.store.insert_api_key(org_id, "sk_acme_primary");
    h.store.insert_api_key(org_id, "sk_acme_secondary");

    let identity = IdentityStore::new(h.store.storage(), Duration::from_secs(1));
    assert_eq!(
        identity.resolve("sk_acme_primary").await.unwrap(),
        Some((key_id, org_id))
    );
    assert_eq!(identity.resolve("sk_unknown").await.unwrap(), None);

    let principal = h
        .metering
        .validate_credential("Bearer sk_acme_primary")
        .await
        .unwrap();
    assert_eq!(principal.key_id(), key_id);
    assert_eq!(principal.org_id(), org_id);
}

#[tokio::test]
async fn unknown_and_empty_credentials_are_indistinguishable() {
    let h = Harness::new();
    h.tenant("acme");

    let unknown = h.metering.validate_credential("Bearer sk_nope").await;
    let empty = h.metering.validate_credential("").await;
    let scheme_only = h.metering.validate_credential("Bearer ").await;

    for result in [unknown, empty, scheme_only] {
        let err = result.unwrap_err();
        assert!(matches!(err, CoreError::Unauthenticated));
        assert_eq!(err.to_string(), "unauthenticated");
    }
}

#[tokio::test]
async fn empty_credential_is_rejected_before_lookup() {
    let h = Harness::new();
    h.store.set_unavailable(true);

    // A lookup would have surfaced the outage instead.
    let err = h.metering.validate_credential("   ").await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthenticated));
}

#[tokio::test]
async fn storage_outage_is_not_reported_as_bad_credential() {
    let h = Harness::uncached();
    let tenant = h.tenant("acme");
    h.store.set_unavailable(true);

    let err = h
        .metering
        .validate_credential(&tenant.api_key)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn positive_lookups_are_cached() {
    let h = Harness::new();
    let tenant = h.tenant("acme");
    h.login(&tenant).await;

    h.store.set_unavailable(true);
    let principal = h.metering.validate_credential(&tenant.api_key).await.unwrap();
    assert_eq!(principal.org_id(), tenant.org_id);
}

#[tokio::test]
async fn misses_are_never_cached() {
    let h = Harness::new();
    let org_id = h.store.insert_organization("late");

    assert!(h.metering.validate_credential("sk_late").await.is_err());
    h.store.insert_api_key(org_id, "sk_late");

    let principal = h.metering.validate_credential("sk_late").await.unwrap();
    assert_eq!(principal.org_id(), org_id);
}

#[tokio::test]
async fn zero_ttl_disables_cache() {
    let h = Harness::uncached();
    let tenant = h.tenant("acme");
    h.login(&tenant).await;

    h.store.revoke_api_key(&tenant.api_key);
    let err = h
        .metering
        .validate_credential(&tenant.api_key)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthenticated));
}

#[tokio::test]
async fn cached_keys_expire() {
    let h = Harness::with_config(
        meter_core::MeteringConfig::default().with_key_cache_ttl(Duration::from_millis(50)),
    );
    let tenant = h.tenant("acme");
    h.login(&tenant).await;
    h.store.revoke_api_key(&tenant.api_key);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.metering.validate_credential(&tenant.api_key).await.is_err());
}
