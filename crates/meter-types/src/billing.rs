//! Pricing plans and invoices

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{InvoiceId, Money, OrgId, PlanId, TypeError};

/// Namespace for deterministic invoice IDs
const INVOICE_NAMESPACE: Uuid = Uuid::from_u128(0x6d65_7465_726c_696e_6500_0000_696e_7601);

/// Linear pricing rule binding a metric to a unit price and free quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan ID
    pub id: PlanId,
    /// Owning organization
    pub org_id: OrgId,
    /// Human-readable name
    pub name: String,
    /// Metric the plan prices
    pub metric: String,
    /// Price per chargeable unit
    pub unit_price: Money,
    /// Units included for free each period
    pub free_quota: i64,
}

/// Invoice status
///
/// Only `Draft` is produced by invoice generation; the other states belong to
/// downstream payment collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Freshly computed, still regenerable
    Draft,
    /// Sent to the customer
    Finalized,
    /// Settled
    Paid,
    /// Cancelled
    Void,
}

impl InvoiceStatus {
    /// Status as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Finalized => "finalized",
            Self::Paid => "paid",
            Self::Void => "void",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "finalized" => Ok(Self::Finalized),
            "paid" => Ok(Self::Paid),
            "void" => Ok(Self::Void),
            other => Err(TypeError::UnknownStatus(other.to_string())),
        }
    }
}

/// Half-open billing window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BillingPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl BillingPeriod {
    /// Create a period; `end` must be strictly after `start`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TypeError> {
        if end <= start {
            return Err(TypeError::EmptyPeriod);
        }
        Ok(Self { start, end })
    }

    /// Create a period from epoch seconds
    pub fn from_unix(start: i64, end: i64) -> Result<Self, TypeError> {
        let start =
            DateTime::from_timestamp(start, 0).ok_or(TypeError::TimestampOutOfRange(start))?;
        let end = DateTime::from_timestamp(end, 0).ok_or(TypeError::TimestampOutOfRange(end))?;
        Self::new(start, end)
    }

    /// Inclusive start
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl InvoiceId {
    /// Deterministic ID for an organization's invoice over a period.
    ///
    /// Regenerating the same period therefore upserts the same invoice row.
    pub fn for_period(org_id: OrgId, period: &BillingPeriod) -> Self {
        let name = format!(
            "{}:{}:{}",
            org_id,
            period.start.timestamp(),
            period.end.timestamp()
        );
        Self(Uuid::new_v5(&INVOICE_NAMESPACE, name.as_bytes()))
    }
}

/// Invoice computed from metered usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice ID (upsert key)
    pub id: InvoiceId,
    /// Owning organization
    pub org_id: OrgId,
    /// Period start (inclusive)
    pub period_start: DateTime<Utc>,
    /// Period end (exclusive)
    pub period_end: DateTime<Utc>,
    /// Sum of all plan costs
    pub total_amount: Money,
    /// Lifecycle status
    pub status: InvoiceStatus,
    /// When the invoice row was first created
    pub created_at: DateTime<Utc>,
}
