//! Usage events and aggregates

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::OrgId;

/// A single metered fact. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Owning organization
    pub org_id: OrgId,
    /// Metric name (e.g. `api_calls`)
    pub metric: String,
    /// Quantity, always positive once stored
    pub quantity: i64,
    /// When the usage happened
    pub occurred_at: DateTime<Utc>,
    /// Caller-supplied deduplication token
    pub idempotency_key: Option<String>,
}

/// Per-(organization, metric, day) usage total, recomputed from events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageAggregate {
    /// Owning organization
    pub org_id: OrgId,
    /// Metric name
    pub metric: String,
    /// Bucket start (inclusive)
    pub period_start: DateTime<Utc>,
    /// Bucket end (exclusive)
    pub period_end: DateTime<Utc>,
    /// Summed quantity
    pub total: i64,
}

/// A UTC calendar day, `[start, start + 1 day)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayBucket {
    /// Midnight UTC
    pub start: DateTime<Utc>,
    /// Next midnight UTC
    pub end: DateTime<Utc>,
}

impl DayBucket {
    /// The bucket a timestamp falls into
    pub fn containing(ts: DateTime<Utc>) -> Self {
        let start = ts.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// Whether the bucket lies entirely inside `[from, to)`
    pub fn within(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start >= from && self.end <= to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_bucket_truncates_to_utc_midnight() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap();
        let bucket = DayBucket::containing(ts);

        assert_eq!(bucket.start, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
        assert_eq!(bucket.end, Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_midnight_starts_a_new_bucket() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap();
        assert_eq!(DayBucket::containing(ts).start, ts);
    }

    #[test]
    fn test_within_is_half_open() {
        let bucket = DayBucket::containing(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap());
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        assert!(bucket.within(from, bucket.end));
        assert!(!bucket.within(from, bucket.start));
    }
}
