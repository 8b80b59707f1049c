//! Organization handlers

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::instrument;

use super::shared::record_op_duration;
use crate::error::{ApiError, ApiResult};
use crate::extractors::Authenticated;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub id: String,
    pub name: String,
}

/// Get the caller's organization
#[instrument(skip(state, principal), fields(org_id = %principal.org_id()))]
pub async fn get_organization(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> ApiResult<Json<OrganizationResponse>> {
    let start = Instant::now();
    let result = state.metering.organization(&principal).await;
    record_op_duration("get_organization", start, result.is_ok());

    let org = result?.ok_or(ApiError::OrganizationNotFound)?;
    Ok(Json(OrganizationResponse {
        id: org.id.to_string(),
        name: org.name,
    }))
}
