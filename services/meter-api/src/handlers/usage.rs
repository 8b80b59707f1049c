//! Usage handlers

use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use meter_core::{RecordOutcome, UsageRecord};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::shared::record_op_duration;
use crate::error::{ApiError, ApiResult};
use crate::extractors::Authenticated;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `POST /usage`. Any `org_id` field is ignored.
#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    pub metric: String,
    pub quantity: i64,
    /// Epoch seconds; absent or `0` means now
    #[serde(default)]
    pub occurred_at: Option<i64>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl TryFrom<RecordUsageRequest> for UsageRecord {
    type Error = ApiError;

    fn try_from(req: RecordUsageRequest) -> Result<Self, Self::Error> {
        let occurred_at = req
            .occurred_at
            .map(|secs| {
                DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                    ApiError::BadRequest(format!("occurred_at out of range: {secs}"))
                })
            })
            .transpose()?;
        Ok(Self {
            metric: req.metric,
            quantity: req.quantity,
            occurred_at,
            idempotency_key: req.idempotency_key,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RecordUsageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub metric: String,
}

#[derive(Debug, Serialize)]
pub struct AggregateResponse {
    pub metric: String,
    pub total: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UsageSummaryResponse {
    pub aggregates: Vec<AggregateResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Record usage for the caller's organization
#[instrument(skip(state, principal, payload), fields(org_id = %principal.org_id(), metric = tracing::field::Empty))]
pub async fn record_usage(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<RecordUsageRequest>, JsonRejection>,
) -> ApiResult<Json<RecordUsageResponse>> {
    let Json(req) = payload?;
    tracing::Span::current().record("metric", req.metric.as_str());

    let record = UsageRecord::try_from(req)?;

    let start = Instant::now();
    let result = state.metering.record_usage(&principal, record).await;
    record_op_duration("record_usage", start, result.is_ok());

    let response = match result? {
        RecordOutcome::Recorded => RecordUsageResponse {
            success: true,
            reason: None,
        },
        RecordOutcome::Declined(reason) => RecordUsageResponse {
            success: false,
            reason: Some(reason.as_str()),
        },
    };
    Ok(Json(response))
}

/// Daily usage totals for one metric, newest first
#[instrument(skip(state, principal, query), fields(org_id = %principal.org_id()))]
pub async fn get_usage(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> ApiResult<Json<UsageSummaryResponse>> {
    let Query(query) = query?;
    let start = Instant::now();
    let result = state.metering.usage_summary(&principal, &query.metric).await;
    record_op_duration("get_usage", start, result.is_ok());

    let aggregates = result?
        .into_iter()
        .map(|agg| AggregateResponse {
            metric: agg.metric,
            total: agg.total,
            period_start: agg.period_start,
            period_end: agg.period_end,
        })
        .collect();
    Ok(Json(UsageSummaryResponse { aggregates }))
}
