//! Invoice generation and listing

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{money, Harness};
use meter_core::{
    CoreError, MeteringApi, MeteringConfig, UsageRecord, UsageSource, MAX_EVENT_QUANTITY,
};
use meter_types::{BillingPeriod, InvoiceId, InvoiceStatus, Money};

fn march() -> BillingPeriod {
    BillingPeriod::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

fn mid_march() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

async fn seed_usage(h: &Harness, principal: &meter_core::Principal, metric: &str, quantity: i64) {
    let outcome = h
        .metering
        .record_usage(principal, UsageRecord::new(metric, quantity).at(mid_march()))
        .await
        .unwrap();
    assert!(outcome.is_success(), "{outcome:?}");
}

#[tokio::test]
async fn invoice_sums_every_plan() {
    let h = Harness::new();
    let tenant = h.tenant("acme");
    let principal = h.login(&tenant).await;
    h.store
        .insert_plan(tenant.org_id, "calls", "api_calls", money("0.01"), 1000);
    h.store
        .insert_plan(tenant.org_id, "disk", "storage", money("0.05"), 0);

    seed_usage(&h, &principal, "api_calls", 5000).await;
    seed_usage(&h, &principal, "storage", 200).await;

    let invoice = h.metering.generate_invoice(&principal, march()).await.unwrap();

    assert_eq!(invoice.total_amount, money("50.00"));
    assert_eq!(invoice.total_amount.to_string(), "50.00");
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.org_id, tenant.org_id);
    assert_eq!(invoice.id, InvoiceId::for_period(tenant.org_id, &march()));
}

#[tokio::test]
async fn usage_below_quota_costs_nothing() {
    let h = Harness::new();
    let tenant = h.tenant("acme");
    let principal = h.login(&tenant).await;
    h.store
        .insert_plan(tenant.org_id, "calls", "api_calls", money("0.01"), 1000);
    seed_usage(&h, &principal, "api_calls", 400).await;

    let invoice = h.metering.generate_invoice(&principal, march()).await.unwrap();
    assert_eq!(invoice.total_amount, Money::ZERO);
    assert_eq!(invoice.total_amount.to_string(), "0.00");
}

#[tokio::test]
async fn no_plans_yields_zero_invoice() {
    let h = Harness::new();
    let principal = h.login(&h.tenant("acme")).await;

    let invoice = h.metering.generate_invoice(&principal, march()).await.unwrap();
    assert!(invoice.total_amount.is_zero());
}

#[tokio::test]
async fn usage_outside_period_is_ignored() {
    let h = Harness::new();
    let tenant = h.tenant("acme");
    let principal = h.login(&tenant).await;
    h.store
        .insert_plan(tenant.org_id, "calls", "api_calls", money("1"), 0);

    let period = march();
    for at in [period.start() - Duration::seconds(1), period.end()] {
        h.metering
            .record_usage(&principal, UsageRecord::new("api_calls", 9).at(at))
            .await
            .unwrap();
    }
    h.metering
        .record_usage(&principal, UsageRecord::new("api_calls", 2).at(period.start()))
        .await
        .unwrap();

    let invoice = h.metering.generate_invoice(&principal, period).await.unwrap();
    assert_eq!(invoice.total_amount, money("2"));
}

#[tokio::test]
async fn regeneration_overwrites_the_same_invoice() {
    let h = Harness::new();
    let tenant = h.tenant("acme");
    let principal = h.login(&tenant).await;
    h.store
        .insert_plan(tenant.org_id, "calls", "api_calls", money("0.01"), 0);

    seed_usage(&h, &principal, "api_calls", 100).await;
    let first = h.metering.generate_invoice(&principal, march()).await.unwrap();

    seed_usage(&h, &principal, "api_calls", 100).await;
    let second = h.metering.generate_invoice(&principal, march()).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(first.total_amount, money("1.00"));
    assert_eq!(second.total_amount, money("2.00"));
    assert_eq!(h.metering.list_invoices(&principal).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reversed_period_is_rejected() {
    let err = BillingPeriod::from_unix(1_711_929_600, 1_709_251_200)
        .map_err(CoreError::from)
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidPeriod));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn listing_returns_fifty_newest() {
    let h = Harness::new();
    let principal = h.login(&h.tenant("acme")).await;
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let mut generated = Vec::new();
    for day in 0..60 {
        let period =
            BillingPeriod::new(base + Duration::days(day), base + Duration::days(day + 1)).unwrap();
        generated.push(h.metering.generate_invoice(&principal, period).await.unwrap().id);
    }

    let listed: Vec<_> = h
        .metering
        .list_invoices(&principal)
        .await
        .unwrap()
        .into_iter()
        .map(|invoice| invoice.id)
        .collect();

    generated.reverse();
    assert_eq!(listed.len(), 50);
    assert_eq!(listed, generated[..50]);
}

#[tokio::test]
async fn aggregate_source_lags_until_aggregation() {
    let h = Harness::with_config(
        MeteringConfig::default().with_usage_source(UsageSource::Aggregates),
    );
    let tenant = h.tenant("acme");
    let principal = h.login(&tenant).await;
    h.store
        .insert_plan(tenant.org_id, "calls", "api_calls", money("0.01"), 1000);
    seed_usage(&h, &principal, "api_calls", 5000).await;

    let before = h.metering.generate_invoice(&principal, march()).await.unwrap();
    assert_eq!(before.total_amount, Money::ZERO);

    h.metering.aggregate_all().await.unwrap();
    let after = h.metering.generate_invoice(&principal, march()).await.unwrap();
    assert_eq!(after.total_amount, money("40.00"));
}

#[tokio::test]
async fn overflowing_total_is_an_error() {
    let h = Harness::new();
    let tenant = h.tenant("acme");
    let principal = h.login(&tenant).await;
    h.store
        .insert_plan(tenant.org_id, "calls", "api_calls", money("1000000"), 0);
    seed_usage(&h, &principal, "api_calls", MAX_EVENT_QUANTITY).await;

    let err = h
        .metering
        .generate_invoice(&principal, march())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AmountOverflow));
    assert!(h.metering.list_invoices(&principal).await.unwrap().is_empty());
}
