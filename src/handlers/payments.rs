//! Payment endpoints: intent creation, polling, and rail notification.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    dtos::{
        CreatePaymentIntentRequest, InespayNotification, IntentResponse, NotificationAck,
        PaymentRedirectResponse,
    },
    error::PortalError,
    middleware::{CustomerContext, PortalJson},
    models::{IntentStatus, PaymentMethod},
    services::inespay::RailCustomData,
    services::metrics,
    services::orchestrator::{self, PaymentOutcome, PaymentRequest},
    services::repository::IntentUpdate,
    AppState,
};

/// Create a payment intent for a case and hand back a redirect URL.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    customer: CustomerContext,
    PortalJson(payload): PortalJson<CreatePaymentIntentRequest>,
) -> Result<Json<PaymentRedirectResponse>, PortalError> {
    tracing::info!(
        case_id = payload.expediente_id,
        payment_type = %payload.payment_type,
        method = ?payload.method,
        customer_id = customer.customer_id,
        "payment intent requested"
    );

    let request = PaymentRequest::validate(
        payload.expediente_id,
        &payload.payment_type,
        payload.method.as_deref(),
    )?;

    let outcome = orchestrator::create_payment(
        &state.giav,
        &state.inespay,
        &state.repository,
        &state.config.payments,
        &customer,
        request,
    )
    .await?;

    let response = match outcome {
        PaymentOutcome::CardRedirect { redirect_url } => PaymentRedirectResponse {
            ok: true,
            redirect_url,
            method: None,
            intent_id: None,
        },
        PaymentOutcome::BankTransfer {
            redirect_url,
            intent_id,
        } => PaymentRedirectResponse {
            ok: true,
            redirect_url,
            method: Some(PaymentMethod::BankTransfer.as_str().to_string()),
            intent_id: Some(intent_id),
        },
    };

    Ok(Json(response))
}

/// Owner-scoped intent lookup for status polling after the redirect.
pub async fn get_intent(
    State(state): State<AppState>,
    customer: CustomerContext,
    Path(intent_id): Path<Uuid>,
) -> Result<Json<IntentResponse>, PortalError> {
    if customer.customer_id <= 0 {
        return Err(PortalError::NoClient);
    }

    let intent = state
        .repository
        .get_intent_for_customer(intent_id, customer.customer_id)
        .await?
        .ok_or(PortalError::NotFound)?;

    Ok(Json(IntentResponse::from(intent)))
}

/// Notification callback from the bank-transfer rail.
///
/// Idempotent: replays and out-of-order callbacks are acknowledged without
/// state change. The guard verifies the echoed custom-data token against the
/// random token this service embedded in the rail reference at init time.
pub async fn inespay_notify(
    State(state): State<AppState>,
    PortalJson(notification): PortalJson<InespayNotification>,
) -> Result<Json<NotificationAck>, PortalError> {
    let encoded = notification
        .custom_data
        .as_deref()
        .ok_or(PortalError::InvalidNotification)?;
    let custom = RailCustomData::decode(encoded).map_err(|error| {
        tracing::warn!(%error, "undecodable rail notification");
        PortalError::InvalidNotification
    })?;

    let intent = state
        .repository
        .get_intent(custom.intent_id)
        .await?
        .ok_or_else(|| {
            tracing::error!(intent_id = %custom.intent_id, "notification for unknown intent");
            PortalError::IntentMissing
        })?;

    let expected_token = orchestrator::reference_token(&intent.reference);
    if expected_token != Some(custom.token.as_str()) {
        tracing::warn!(intent_id = %intent.id, "notification token mismatch");
        return Err(PortalError::NotificationRejected);
    }

    if intent.status.is_terminal() {
        tracing::info!(
            intent_id = %intent.id,
            status = ?intent.status,
            "notification replay for terminal intent"
        );
        return Ok(Json(NotificationAck {
            ok: true,
            status: intent.status,
        }));
    }

    let raw_status = notification.status.clone().unwrap_or_default();
    let next = if is_success_status(&raw_status) {
        IntentStatus::Completed
    } else {
        IntentStatus::Failed
    };

    if !intent.status.can_transition_to(next) {
        tracing::warn!(
            intent_id = %intent.id,
            from = ?intent.status,
            to = ?next,
            "notification would require an illegal transition; acknowledged without change"
        );
        return Ok(Json(NotificationAck {
            ok: true,
            status: intent.status,
        }));
    }

    let update = IntentUpdate {
        status: Some(next),
        provider_payment_id: notification.single_payin_id.clone(),
        payload: {
            let mut map = serde_json::Map::new();
            map.insert(
                "inespay_notify".to_string(),
                serde_json::json!({
                    "status": raw_status,
                    "single_payin_id": notification.single_payin_id,
                    "reference": notification.reference,
                    "at": chrono::Utc::now().to_rfc3339(),
                }),
            );
            map
        },
    };

    // Compare-and-set on the status we read: two conflicting callbacks can
    // both pass the transition check above, but only one write can land.
    let matched = state
        .repository
        .update_intent(intent.id, Some(intent.status), update)
        .await?;
    if !matched {
        let current = state
            .repository
            .get_intent(intent.id)
            .await?
            .ok_or(PortalError::IntentMissing)?;
        tracing::warn!(
            intent_id = %intent.id,
            status = ?current.status,
            "notification lost a concurrent update; acknowledged without change"
        );
        return Ok(Json(NotificationAck {
            ok: true,
            status: current.status,
        }));
    }
    metrics::record_intent(next.as_str());

    tracing::info!(intent_id = %intent.id, status = ?next, "intent reconciled from notification");

    Ok(Json(NotificationAck {
        ok: true,
        status: next,
    }))
}

fn is_success_status(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_uppercase().as_str(),
        "OK" | "DONE" | "EXECUTED" | "COMPLETED" | "PAID" | "SUCCESS"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses() {
        assert!(is_success_status("OK"));
        assert!(is_success_status("done"));
        assert!(is_success_status(" Executed "));
        assert!(!is_success_status("REJECTED"));
        assert!(!is_success_status(""));
    }
}
