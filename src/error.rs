use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Portal-facing error taxonomy.
///
/// Every failure maps to a closed `code` plus a user-safe message; internal
/// detail is logged, never serialized into the response body.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("expediente id must be a positive integer")]
    InvalidExpediente,

    #[error("payment type must be 'deposit' or 'balance'")]
    InvalidType,

    #[error("payment method must be 'card' or 'bank_transfer'")]
    InvalidMethod,

    #[error("payment amount must be greater than zero")]
    InvalidAmount,

    #[error("request body could not be parsed")]
    InvalidBody(String),

    #[error("no customer account is linked to this user")]
    NoClient,

    #[error("a deposit payment is not currently allowed for this case")]
    DepositNotAllowed,

    #[error("there is no pending balance to pay for this case")]
    BalanceNotAllowed,

    #[error("bank transfer payments are not configured")]
    InespayMissing,

    #[error("payment intent record not found")]
    IntentMissing,

    #[error("no payment page is configured for card payments")]
    NoRedirect,

    #[error("could not record the payment attempt")]
    IntentCreateFailed(#[source] anyhow::Error),

    #[error("the bank transfer provider rejected the payment")]
    InespayInitFailed(#[source] anyhow::Error),

    #[error("the bank transfer provider returned no payment link")]
    InespayMissingLink,

    #[error("notification payload could not be decoded")]
    InvalidNotification,

    #[error("notification does not match the payment intent")]
    NotificationRejected,

    #[error("authentication is required")]
    Unauthorized,

    #[error("resource not found")]
    NotFound,

    #[error("database error")]
    Database(#[from] mongodb::error::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    pub fn code(&self) -> &'static str {
        match self {
            PortalError::InvalidExpediente => "invalid_expediente",
            PortalError::InvalidType => "invalid_type",
            PortalError::InvalidMethod => "invalid_method",
            PortalError::InvalidAmount => "invalid_amount",
            PortalError::InvalidBody(_) => "invalid_body",
            PortalError::NoClient => "no_client",
            PortalError::DepositNotAllowed => "deposit_not_allowed",
            PortalError::BalanceNotAllowed => "balance_not_allowed",
            PortalError::InespayMissing => "inespay_missing",
            PortalError::IntentMissing => "intent_missing",
            PortalError::NoRedirect => "no_redirect",
            PortalError::IntentCreateFailed(_) => "intent_create_failed",
            PortalError::InespayInitFailed(_) => "inespay_init_failed",
            PortalError::InespayMissingLink => "inespay_missing_link",
            PortalError::InvalidNotification => "invalid_notification",
            PortalError::NotificationRejected => "notification_rejected",
            PortalError::Unauthorized => "unauthorized",
            PortalError::NotFound => "not_found",
            PortalError::Database(_) => "database_error",
            PortalError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PortalError::InvalidExpediente
            | PortalError::InvalidType
            | PortalError::InvalidMethod
            | PortalError::InvalidAmount
            | PortalError::InvalidBody(_)
            | PortalError::InvalidNotification => StatusCode::BAD_REQUEST,
            PortalError::NoClient
            | PortalError::DepositNotAllowed
            | PortalError::BalanceNotAllowed
            | PortalError::NotificationRejected => StatusCode::FORBIDDEN,
            PortalError::Unauthorized => StatusCode::UNAUTHORIZED,
            PortalError::NotFound => StatusCode::NOT_FOUND,
            PortalError::InespayMissing
            | PortalError::IntentMissing
            | PortalError::NoRedirect
            | PortalError::IntentCreateFailed(_)
            | PortalError::Database(_)
            | PortalError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PortalError::InespayInitFailed(_) | PortalError::InespayMissingLink => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

/// Failure envelope: `{ok: false, code, message}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        match &self {
            PortalError::IntentCreateFailed(source)
            | PortalError::InespayInitFailed(source)
            | PortalError::Internal(source) => {
                tracing::error!(code = self.code(), error = %source, "request failed");
            }
            PortalError::Database(source) => {
                tracing::error!(code = self.code(), error = %source, "request failed");
            }
            PortalError::InvalidBody(detail) => {
                tracing::debug!(code = self.code(), detail = %detail, "request rejected");
            }
            _ => {
                tracing::debug!(code = self.code(), "request rejected");
            }
        }

        let body = ErrorEnvelope {
            ok: false,
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
