//! Customer context extractor.
//!
//! The portal frontend authenticates the user and forwards their identity in
//! headers. The linked GIAV customer id may legitimately be absent (a portal
//! account not yet linked to an agency customer); it is carried as `0` here
//! and rejected by the flows that require it, so those flows can answer with
//! their own `no_client` error instead of a generic header rejection.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::PortalError;

/// Identity of the caller, extracted from request headers.
#[derive(Debug, Clone)]
pub struct CustomerContext {
    /// Portal user id (always present on authenticated routes).
    pub user_id: String,
    /// Linked GIAV customer id; `0` when the account is not linked.
    pub customer_id: i64,
    /// Display name used as payer name on rail requests.
    pub display_name: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for CustomerContext
where
    S: Send + Sync,
{
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-ID")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(PortalError::Unauthorized)?
            .to_string();

        let customer_id = parts
            .headers
            .get("X-Customer-ID")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        let display_name = parts
            .headers
            .get("X-Customer-Name")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());

        let span = tracing::Span::current();
        span.record("user_id", user_id.as_str());
        span.record("customer_id", customer_id);

        Ok(CustomerContext {
            user_id,
            customer_id,
            display_name,
        })
    }
}
