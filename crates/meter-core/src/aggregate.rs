//! Periodic usage aggregation
//!
//! Each run recomputes every daily bucket from raw events in one storage
//! statement. Runs are idempotent, so overlapping runs from several processes
//! converge on the same totals.

use std::time::{Duration, Instant};

use meter_db::Storage;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use crate::deadline::bounded;
use crate::error::CoreResult;
use crate::metrics;

/// Outcome of one aggregation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationReport {
    /// Buckets inserted or changed
    pub buckets_upserted: u64,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// Recomputes usage aggregates
#[derive(Clone)]
pub struct Aggregator {
    storage: Storage,
    timeout: Duration,
}

impl Aggregator {
    /// Create an aggregator; `timeout` bounds each run
    pub fn new(storage: Storage, timeout: Duration) -> Self {
        Self { storage, timeout }
    }

    /// Run one full recompute
    #[instrument(skip(self))]
    pub async fn aggregate_all(&self) -> CoreResult<AggregationReport> {
        let start = Instant::now();
        let result = bounded(
            self.timeout,
            "recompute_aggregates",
            self.storage.aggregates.recompute_all(),
        )
        .await;
        let elapsed = start.elapsed();

        match result {
            Ok(buckets_upserted) => {
                metrics::record_aggregation("success", elapsed);
                info!(
                    buckets_upserted,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "aggregation complete"
                );
                Ok(AggregationReport {
                    buckets_upserted,
                    elapsed,
                })
            }
            Err(err) => {
                metrics::record_aggregation("error", elapsed);
                Err(err)
            }
        }
    }

    /// Aggregate immediately, then every `every`, until `shutdown` turns true.
    ///
    /// A failed run is logged; the next tick starts over from scratch.
    pub async fn run(&self, every: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs(), "aggregator started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.aggregate_all().await {
                        error!(error = %err, retryable = err.is_retryable(), "aggregation run failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("aggregator stopped");
    }
}
