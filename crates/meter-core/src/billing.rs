//! Invoice generation
//!
//! Invoices are a pure function of the organization's plans and its usage in
//! the period: `sum(max(0, usage - free_quota) * unit_price)` over every plan.
//! Regenerating a period overwrites the same invoice row.

use std::time::Duration;

use meter_db::{Storage, UpsertInvoice};
use meter_types::{BillingPeriod, Invoice, InvoiceId, InvoiceStatus, Money, Plan};
use tracing::{debug, info, instrument};

use crate::config::UsageSource;
use crate::deadline::bounded;
use crate::error::{CoreError, CoreResult};
use crate::metrics;
use crate::trust::Principal;

/// Maximum invoices returned by a listing
pub const INVOICE_LIST_LIMIT: i64 = 50;

/// Cost of one plan: `max(0, usage - free_quota) * unit_price`.
///
/// `None` if the product does not fit in [`Money`].
pub fn plan_cost(usage: i64, free_quota: i64, unit_price: Money) -> Option<Money> {
    let chargeable = usage.saturating_sub(free_quota).max(0);
    unit_price.checked_mul(chargeable)
}

/// Computes and persists invoices
#[derive(Clone)]
pub struct BillingEngine {
    storage: Storage,
    timeout: Duration,
    usage_source: UsageSource,
}

impl BillingEngine {
    /// Create a new billing engine
    pub fn new(storage: Storage, timeout: Duration, usage_source: UsageSource) -> Self {
        Self {
            storage,
            timeout,
            usage_source,
        }
    }

    async fn usage(&self, principal: &Principal, metric: &str, period: &BillingPeriod) -> CoreResult<i64> {
        let org_id = principal.org_id();
        match self.usage_source {
            UsageSource::Events => {
                bounded(
                    self.timeout,
                    "sum_usage_events",
                    self.storage
                        .events
                        .sum_quantity(org_id, metric, period.start(), period.end()),
                )
                .await
            }
            UsageSource::Aggregates => {
                bounded(
                    self.timeout,
                    "sum_usage_aggregates",
                    self.storage
                        .aggregates
                        .sum_within(org_id, metric, period.start(), period.end()),
                )
                .await
            }
        }
    }

    /// Compute the principal's invoice for `period` and upsert it as a draft
    #[instrument(
        skip(self, principal, period),
        fields(
            org_id = %principal.org_id(),
            period_start = %period.start(),
            period_end = %period.end()
        )
    )]
    pub async fn generate_invoice(
        &self,
        principal: &Principal,
        period: BillingPeriod,
    ) -> CoreResult<Invoice> {
        let org_id = principal.org_id();
        let plans = bounded(
            self.timeout,
            "find_plans",
            self.storage.plans.find_by_org(org_id),
        )
        .await?;

        let mut total = Money::ZERO;
        for row in plans {
            let plan = Plan::try_from(row)?;
            let usage = self.usage(principal, &plan.metric, &period).await?;
            let cost = plan_cost(usage, plan.free_quota, plan.unit_price)
                .ok_or(CoreError::AmountOverflow)?;
            debug!(plan = %plan.name, metric = %plan.metric, usage, %cost, "plan priced");
            total = total.checked_add(cost).ok_or(CoreError::AmountOverflow)?;
        }

        let row = bounded(
            self.timeout,
            "upsert_invoice",
            self.storage.invoices.upsert(UpsertInvoice {
                id: InvoiceId::for_period(org_id, &period),
                org_id,
                period_start: period.start(),
                period_end: period.end(),
                total_amount: total,
                status: InvoiceStatus::Draft,
            }),
        )
        .await?;

        let invoice = Invoice::try_from(row)?;
        metrics::record_invoice_generated();
        info!(invoice_id = %invoice.id, total = %invoice.total_amount, "invoice generated");
        Ok(invoice)
    }

    /// Newest invoices of the principal's organization, at most [`INVOICE_LIST_LIMIT`]
    #[instrument(skip(self, principal), fields(org_id = %principal.org_id()))]
    pub async fn list_invoices(&self, principal: &Principal) -> CoreResult<Vec<Invoice>> {
        let rows = bounded(
            self.timeout,
            "find_invoices",
            self.storage
                .invoices
                .find_by_org(principal.org_id(), INVOICE_LIST_LIMIT),
        )
        .await?;

        rows.into_iter()
            .map(|row| Invoice::try_from(row).map_err(CoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENT: Money = Money::from_micros(10_000);

    #[test]
    fn test_plan_cost_charges_above_quota() {
        assert_eq!(plan_cost(5000, 1000, CENT).unwrap().to_string(), "40.00");
    }

    #[test]
    fn test_plan_cost_floors_at_zero() {
        assert_eq!(plan_cost(500, 1000, CENT), Some(Money::ZERO));
        assert_eq!(plan_cost(0, 0, CENT), Some(Money::ZERO));
    }

    #[test]
    fn test_plan_cost_overflow() {
        assert_eq!(plan_cost(i64::MAX, 0, Money::from_micros(2)), None);
    }
}
