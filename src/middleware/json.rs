//! JSON body extractor that speaks the portal's error envelope.
//!
//! Axum's default `Json` rejection answers with a plain-text 4xx. Every
//! failure leaving this service carries the `{ok, code, message}` envelope,
//! body deserialization failures included, so handlers take their bodies
//! through this wrapper instead.

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::PortalError;

pub struct PortalJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for PortalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PortalError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(PortalJson(value)),
            Err(rejection) => Err(PortalError::InvalidBody(rejection.to_string())),
        }
    }
}
