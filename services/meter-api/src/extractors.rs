//! Axum extractors for authentication

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderName};
use meter_core::Principal;

use crate::error::ApiError;
use crate::state::AppState;

/// Header checked before `Authorization`
pub static X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Caller authenticated through the trust gateway.
///
/// Handlers that take this extractor run only after authentication succeeded,
/// and before any request body is parsed.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

/// First non-blank credential header, `X-API-Key` winning over `Authorization`
fn credential(parts: &Parts) -> &str {
    [&X_API_KEY, &header::AUTHORIZATION]
        .into_iter()
        .filter_map(|name| parts.headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or("")
}

impl<S> FromRequestParts<S> for Authenticated
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let principal = app_state
            .metering
            .validate_credential(credential(parts))
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Credential rejected");
                ApiError::from(e)
            })?;

        Ok(Self(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_x_api_key_wins() {
        let parts = parts(&[("x-api-key", "sk_a"), ("authorization", "Bearer sk_b")]);
        assert_eq!(credential(&parts), "sk_a");
    }

    #[test]
    fn test_falls_back_to_authorization() {
        let parts = parts(&[("x-api-key", "  "), ("authorization", "Bearer sk_b")]);
        assert_eq!(credential(&parts), "Bearer sk_b");
    }

    #[test]
    fn test_missing_headers() {
        assert_eq!(credential(&parts(&[])), "");
    }
}
