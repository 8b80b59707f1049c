//! Invoice handlers

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use meter_core::CoreError;
use meter_types::{BillingPeriod, Invoice, InvoiceStatus, Money};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::shared::record_op_duration;
use crate::error::ApiResult;
use crate::extractors::Authenticated;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `POST /invoices`, bounds in epoch seconds
#[derive(Debug, Deserialize)]
pub struct GenerateInvoiceRequest {
    pub period_start: i64,
    pub period_end: i64,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub org_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_amount: Money,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id.to_string(),
            org_id: invoice.org_id.to_string(),
            period_start: invoice.period_start,
            period_end: invoice.period_end,
            total_amount: invoice.total_amount,
            status: invoice.status,
            created_at: invoice.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListInvoicesResponse {
    pub invoices: Vec<InvoiceResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Generate (or regenerate) the caller's invoice for a period
#[instrument(skip(state, principal, payload), fields(org_id = %principal.org_id()))]
pub async fn generate_invoice(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<GenerateInvoiceRequest>, JsonRejection>,
) -> ApiResult<Json<InvoiceResponse>> {
    let Json(req) = payload?;
    let period =
        BillingPeriod::from_unix(req.period_start, req.period_end).map_err(CoreError::from)?;

    let start = Instant::now();
    let result = state.metering.generate_invoice(&principal, period).await;
    record_op_duration("generate_invoice", start, result.is_ok());

    Ok(Json(result?.into()))
}

/// List the caller's invoices, newest first
#[instrument(skip(state, principal), fields(org_id = %principal.org_id()))]
pub async fn list_invoices(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<ListInvoicesResponse>> {
    let start = Instant::now();
    let result = state.metering.list_invoices(&principal).await;
    record_op_duration("list_invoices", start, result.is_ok());

    let invoices = result?.into_iter().map(InvoiceResponse::from).collect();
    Ok(Json(ListInvoicesResponse { invoices }))
}
