//! Usage ingestion
//!
//! Writes raw usage events for the authenticated organization. Bad input is
//! declined with a reason rather than raised as an error; only storage trouble
//! is an error.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use meter_db::Storage;
use meter_types::{UsageAggregate, UsageEvent};
use tracing::{debug, instrument};

use crate::deadline::bounded;
use crate::error::CoreResult;
use crate::metrics;
use crate::trust::Principal;

/// Maximum aggregates returned by a usage summary
pub const SUMMARY_LIMIT: i64 = 30;

/// Maximum length for metric names (bounds label cardinality)
const MAX_METRIC_NAME_LEN: usize = 64;

/// Largest quantity a single event may carry
pub const MAX_EVENT_QUANTITY: i64 = 1_000_000_000_000;

/// Maximum length for idempotency keys
const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Caller-supplied usage. Carries no tenant identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub metric: String,
    pub quantity: i64,
    pub occurred_at: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
}

impl UsageRecord {
    /// Record `quantity` of `metric` happening now
    pub fn new(metric: impl Into<String>, quantity: i64) -> Self {
        Self {
            metric: metric.into(),
            quantity,
            occurred_at: None,
            idempotency_key: None,
        }
    }

    /// Set when the usage happened
    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Set the deduplication key
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Why a record was not stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    EmptyMetric,
    NonPositiveQuantity,
    /// Above [`MAX_EVENT_QUANTITY`]
    QuantityTooLarge,
    /// Too long, bad characters, or a bad first character
    InvalidMetric,
    IdempotencyKeyTooLong,
}

impl DeclineReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyMetric => "empty_metric",
            Self::NonPositiveQuantity => "non_positive_quantity",
            Self::QuantityTooLarge => "quantity_too_large",
            Self::InvalidMetric => "invalid_metric",
            Self::IdempotencyKeyTooLong => "idempotency_key_too_long",
        }
    }
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an ingestion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Stored, or absorbed as a duplicate of an already-stored keyed event
    Recorded,
    /// Rejected input; nothing was written
    Declined(DeclineReason),
}

impl RecordOutcome {
    /// Whether the caller should see `success = true`
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Recorded)
    }
}

fn validate(record: &UsageRecord) -> Result<(), DeclineReason> {
    if record.metric.is_empty() {
        return Err(DeclineReason::EmptyMetric);
    }
    if record.quantity <= 0 {
        return Err(DeclineReason::NonPositiveQuantity);
    }
    if record.quantity > MAX_EVENT_QUANTITY {
        return Err(DeclineReason::QuantityTooLarge);
    }
    if record.metric.len() > MAX_METRIC_NAME_LEN
        || !record
            .metric
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(DeclineReason::InvalidMetric);
    }
    // Must start with letter or underscore
    if let Some(first) = record.metric.chars().next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(DeclineReason::InvalidMetric);
        }
    }
    if record
        .idempotency_key
        .as_ref()
        .is_some_and(|key| key.len() > MAX_IDEMPOTENCY_KEY_LEN)
    {
        return Err(DeclineReason::IdempotencyKeyTooLong);
    }
    Ok(())
}

/// Writes usage events and reads usage summaries
#[derive(Clone)]
pub struct UsageIngestor {
    storage: Storage,
    timeout: Duration,
}

impl UsageIngestor {
    /// Create a new ingestor
    pub fn new(storage: Storage, timeout: Duration) -> Self {
        Self { storage, timeout }
    }

    /// Record usage for the principal's organization.
    ///
    /// A keyed record that was already stored is reported as `Recorded`; the
    /// caller cannot tell the first write from an absorbed retry.
    #[instrument(skip(self, principal, record), fields(org_id = %principal.org_id(), metric = %record.metric))]
    pub async fn record(
        &self,
        principal: &Principal,
        record: UsageRecord,
    ) -> CoreResult<RecordOutcome> {
        if let Err(reason) = validate(&record) {
            debug!(%reason, "usage declined");
            metrics::record_usage_outcome("declined");
            return Ok(RecordOutcome::Declined(reason));
        }

        let occurred_at = record
            .occurred_at
            .filter(|ts| ts.timestamp() != 0)
            .unwrap_or_else(Utc::now);
        let event = UsageEvent {
            org_id: principal.org_id(),
            metric: record.metric,
            quantity: record.quantity,
            occurred_at,
            idempotency_key: record.idempotency_key.filter(|key| !key.is_empty()),
        };

        let inserted = bounded(
            self.timeout,
            "insert_usage_event",
            self.storage.events.insert(&event),
        )
        .await?;

        if inserted {
            metrics::record_usage_outcome("recorded");
        } else {
            debug!("duplicate idempotency key absorbed");
            metrics::record_usage_outcome("duplicate");
        }
        Ok(RecordOutcome::Recorded)
    }

    /// Newest daily aggregates of one metric, at most [`SUMMARY_LIMIT`]
    #[instrument(skip(self, principal), fields(org_id = %principal.org_id()))]
    pub async fn summary(
        &self,
        principal: &Principal,
        metric: &str,
    ) -> CoreResult<Vec<UsageAggregate>> {
        let rows = bounded(
            self.timeout,
            "find_aggregates",
            self.storage
                .aggregates
                .find_by_metric(principal.org_id(), metric, SUMMARY_LIMIT),
        )
        .await?;

        Ok(rows.into_iter().map(UsageAggregate::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(metric: &str, quantity: i64) -> UsageRecord {
        UsageRecord::new(metric, quantity)
    }

    #[test]
    fn test_validate_accepts_common_metrics() {
        assert!(validate(&record("api_calls", 1)).is_ok());
        assert!(validate(&record("storage.gb-hours", 1)).is_ok());
        assert!(validate(&record("_internal", 1)).is_ok());
    }

    #[test]
    fn test_empty_metric_wins_over_bad_quantity() {
        assert_eq!(validate(&record("", 0)), Err(DeclineReason::EmptyMetric));
    }

    #[test]
    fn test_non_positive_quantity() {
        assert_eq!(
            validate(&record("api_calls", 0)),
            Err(DeclineReason::NonPositiveQuantity)
        );
        assert_eq!(
            validate(&record("api_calls", -3)),
            Err(DeclineReason::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_quantity_ceiling() {
        assert!(validate(&record("api_calls", MAX_EVENT_QUANTITY)).is_ok());
        assert_eq!(
            validate(&record("api_calls", MAX_EVENT_QUANTITY + 1)),
            Err(DeclineReason::QuantityTooLarge)
        );
        assert_eq!(
            validate(&record("api_calls", i64::MAX)),
            Err(DeclineReason::QuantityTooLarge)
        );
    }

    #[test]
    fn test_invalid_metric_names() {
        let long = "x".repeat(65);
        for metric in ["1st", "a b", "foo<script>", long.as_str()] {
            assert_eq!(
                validate(&record(metric, 1)),
                Err(DeclineReason::InvalidMetric),
                "{metric}"
            );
        }
    }

    #[test]
    fn test_long_idempotency_key() {
        let ok = record("api_calls", 1).with_idempotency_key("k".repeat(255));
        let long = record("api_calls", 1).with_idempotency_key("k".repeat(256));
        assert!(validate(&ok).is_ok());
        assert_eq!(validate(&long), Err(DeclineReason::IdempotencyKeyTooLong));
    }
}
