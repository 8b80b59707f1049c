//! Meter Core - Metering and billing business logic
//!
//! Everything that reads or writes tenant data takes a [`Principal`], and the
//! only way to obtain one is [`TrustGateway::authenticate`].
//!
//! # Example
//!
//! ```rust,ignore
//! use meter_core::{Metering, MeteringApi, MeteringConfig, UsageRecord};
//! use meter_db::Storage;
//!
//! let metering = Metering::new(Storage::postgres(pool), MeteringConfig::default());
//!
//! let principal = metering.validate_credential("Bearer sk_live_...").await?;
//! metering
//!     .record_usage(&principal, UsageRecord::new("api_calls", 1))
//!     .await?;
//! ```

pub mod aggregate;
pub mod billing;
pub mod config;
mod deadline;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod metrics;
pub mod service;
pub mod trust;

pub use aggregate::{AggregationReport, Aggregator};
pub use billing::{plan_cost, BillingEngine, INVOICE_LIST_LIMIT};
pub use config::{MeteringConfig, UsageSource};
pub use error::{CoreError, CoreResult};
pub use identity::IdentityStore;
pub use ingest::{
    DeclineReason, RecordOutcome, UsageIngestor, UsageRecord, MAX_EVENT_QUANTITY, SUMMARY_LIMIT,
};
pub use service::{Metering, MeteringApi};
pub use trust::{extract_credential, Principal, TrustGateway};
