//! Principal introspection

use axum::Json;
use serde::Serialize;

use crate::extractors::Authenticated;

#[derive(Debug, Serialize)]
pub struct PrincipalResponse {
    pub org_id: String,
}

/// Echo the organization the presented key resolves to
pub async fn get_principal(Authenticated(principal): Authenticated) -> Json<PrincipalResponse> {
    Json(PrincipalResponse {
        org_id: principal.org_id().to_string(),
    })
}
