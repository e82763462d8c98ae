//! Payment orchestration.
//!
//! Drives one payment request through validation, eligibility, intent
//! creation and the external rail, and reconciles the stored intent with
//! whatever the rail answered. Invariant: once an intent has been created,
//! every failure path marks it `Failed` before the error reaches the caller,
//! so the store never claims `created` for an attempt the caller saw fail.

use crate::config::PaymentsConfig;
use crate::error::PortalError;
use crate::middleware::CustomerContext;
use crate::models::{IntentStatus, PaymentIntent, PaymentMethod, PaymentProvider, PaymentType};
use crate::services::eligibility::{self, PaymentAction};
use crate::services::giav::GiavClient;
use crate::services::inespay::{InespayClient, RailCustomData, SinglePayinRequest};
use crate::services::metrics;
use crate::services::repository::{IntentRepository, IntentUpdate};
use mongodb::bson::DateTime;
use serde_json::json;
use uuid::Uuid;

/// Validated orchestration input.
#[derive(Debug, Clone, Copy)]
pub struct PaymentRequest {
    pub case_id: i64,
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
}

impl PaymentRequest {
    /// Validate raw client input. Nothing downstream runs on failure.
    pub fn validate(
        case_id: i64,
        payment_type: &str,
        method: Option<&str>,
    ) -> Result<Self, PortalError> {
        if case_id <= 0 {
            return Err(PortalError::InvalidExpediente);
        }
        let payment_type = payment_type
            .parse::<PaymentType>()
            .map_err(|_| PortalError::InvalidType)?;
        let method = match method {
            None | Some("") => PaymentMethod::Card,
            Some(raw) => raw.parse::<PaymentMethod>().map_err(|_| PortalError::InvalidMethod)?,
        };
        Ok(Self {
            case_id,
            payment_type,
            method,
        })
    }
}

#[derive(Debug)]
pub enum PaymentOutcome {
    /// Card method: redirect to the pre-existing payment page.
    CardRedirect { redirect_url: String },
    /// Bank transfer: an intent was recorded and the rail accepted it.
    BankTransfer {
        redirect_url: String,
        intent_id: Uuid,
    },
}

pub async fn create_payment(
    giav: &GiavClient,
    inespay: &InespayClient,
    repository: &IntentRepository,
    payments: &PaymentsConfig,
    customer: &CustomerContext,
    request: PaymentRequest,
) -> Result<PaymentOutcome, PortalError> {
    if customer.customer_id <= 0 {
        return Err(PortalError::NoClient);
    }

    let summary = eligibility::resolve(giav, customer.customer_id, request.case_id).await;
    let actions = eligibility::actions_for(summary.as_ref());
    let action = match request.payment_type {
        PaymentType::Deposit => {
            if !actions.deposit.allowed {
                return Err(PortalError::DepositNotAllowed);
            }
            actions.deposit
        }
        PaymentType::Balance => {
            if !actions.balance.allowed {
                return Err(PortalError::BalanceNotAllowed);
            }
            actions.balance
        }
    };

    match request.method {
        PaymentMethod::Card => card_redirect(payments, request),
        PaymentMethod::BankTransfer => {
            bank_transfer(inespay, repository, payments, customer, request, action).await
        }
    }
}

/// Card payments reuse the pre-existing pay page; no intent is recorded.
fn card_redirect(
    payments: &PaymentsConfig,
    request: PaymentRequest,
) -> Result<PaymentOutcome, PortalError> {
    let pay_url = payments.pay_url.as_deref().ok_or(PortalError::NoRedirect)?;
    let separator = if pay_url.contains('?') { '&' } else { '?' };
    let mode = request.payment_type.card_mode();
    let redirect_url = format!("{}{}mode={}", pay_url, separator, urlencoding::encode(mode));

    tracing::info!(
        case_id = request.case_id,
        mode,
        "redirecting to card payment page"
    );
    Ok(PaymentOutcome::CardRedirect { redirect_url })
}

async fn bank_transfer(
    inespay: &InespayClient,
    repository: &IntentRepository,
    payments: &PaymentsConfig,
    customer: &CustomerContext,
    request: PaymentRequest,
    action: PaymentAction,
) -> Result<PaymentOutcome, PortalError> {
    if !inespay.is_configured() {
        return Err(PortalError::InespayMissing);
    }

    let amount = action.amount;
    if amount <= 0.0 {
        return Err(PortalError::InvalidAmount);
    }
    let amount_cents = (amount * 100.0).round() as i64;

    let (reference, token) = payment_reference(&payments.reference_prefix, request.case_id);
    let now = DateTime::now();
    let intent = PaymentIntent {
        id: Uuid::new_v4(),
        user_id: customer.user_id.clone(),
        customer_id: customer.customer_id,
        case_id: request.case_id,
        amount,
        currency: payments.currency.clone(),
        provider: PaymentProvider::BankTransferGateway,
        method: PaymentMethod::BankTransfer,
        reference: reference.clone(),
        provider_payment_id: None,
        status: IntentStatus::Created,
        payload: audit_entry(
            "init",
            json!({
                "mode": request.payment_type.as_str(),
                "channel": "portal",
                "at": chrono::Utc::now().to_rfc3339(),
            }),
        ),
        created_at: now,
        updated_at: now,
    };

    tracing::info!(
        intent_id = %intent.id,
        case_id = request.case_id,
        customer_id = customer.customer_id,
        amount,
        reference = %reference,
        "creating payment intent"
    );

    repository
        .create_intent(&intent)
        .await
        .map_err(PortalError::IntentCreateFailed)?;
    metrics::record_intent(IntentStatus::Created.as_str());
    metrics::record_amount(&payments.currency, amount_cents as u64);

    let custom_data = RailCustomData {
        intent_id: intent.id,
        token,
        case_id: request.case_id,
        customer_id: customer.customer_id,
        payer_name: customer.display_name.clone(),
    }
    .encode()
    .map_err(PortalError::Internal)?;

    let method_tag = PaymentMethod::BankTransfer.as_str();
    let url_ok = format!(
        "{}?case={}&method={}&status=ok",
        payments.return_url, request.case_id, method_tag
    );
    let url_ko = format!(
        "{}?case={}&method={}&status=ko",
        payments.return_url, request.case_id, method_tag
    );

    let rail_request = SinglePayinRequest {
        amount: amount_cents,
        currency: payments.currency.clone(),
        description: format!("{} - expediente {}", payments.subject, request.case_id),
        subject: payments.subject.clone(),
        reference: reference.clone(),
        url_ok: url_ok.clone(),
        url_ko: url_ko.clone(),
        url_notif: payments.notify_url.clone(),
        success_link_redirect: url_ok,
        failure_link_redirect: url_ko,
        notification_url: payments.notify_url.clone(),
        custom_data,
    };

    let response = match inespay.create_single_payment(&rail_request).await {
        Ok(response) => response,
        Err(error) => {
            mark_init_failed(repository, intent.id, json!({ "error": error.to_string() })).await;
            return Err(PortalError::InespayInitFailed(error));
        }
    };

    let Some(redirect_url) = response.redirect_url().map(str::to_string) else {
        mark_init_failed(
            repository,
            intent.id,
            json!({ "error": "missing_redirect_url" }),
        )
        .await;
        return Err(PortalError::InespayMissingLink);
    };

    let update = IntentUpdate {
        status: Some(IntentStatus::Initiated),
        provider_payment_id: response.single_payin_id.clone(),
        payload: audit_entry(
            "inespay_init",
            json!({
                "status": "ok",
                "single_payin_id": response.single_payin_id,
                "at": chrono::Utc::now().to_rfc3339(),
            }),
        ),
    };
    // The payment is already in flight at the rail; a bookkeeping failure
    // here must not cancel the payer's redirect. The notify path reconciles.
    match repository
        .update_intent(intent.id, Some(IntentStatus::Created), update)
        .await
    {
        Ok(true) => metrics::record_intent(IntentStatus::Initiated.as_str()),
        Ok(false) => {
            tracing::error!(intent_id = %intent.id, "intent already left created state before init update")
        }
        Err(error) => {
            tracing::error!(intent_id = %intent.id, %error, "failed to record rail initiation")
        }
    }

    tracing::info!(
        intent_id = %intent.id,
        single_payin_id = ?response.single_payin_id,
        "bank transfer initiated"
    );

    Ok(PaymentOutcome::BankTransfer {
        redirect_url,
        intent_id: intent.id,
    })
}

/// Best-effort transition to `Failed` with an `inespay_init` audit entry.
async fn mark_init_failed(
    repository: &IntentRepository,
    intent_id: Uuid,
    mut entry: serde_json::Value,
) {
    if let Some(object) = entry.as_object_mut() {
        object.insert(
            "at".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );
    }
    let update = IntentUpdate {
        status: Some(IntentStatus::Failed),
        provider_payment_id: None,
        payload: audit_entry("inespay_init", entry),
    };
    match repository
        .update_intent(intent_id, Some(IntentStatus::Created), update)
        .await
    {
        Ok(true) => metrics::record_intent(IntentStatus::Failed.as_str()),
        Ok(false) => {
            tracing::warn!(intent_id = %intent_id, "intent already left created state")
        }
        Err(error) => {
            tracing::error!(intent_id = %intent_id, %error, "failed to mark intent as failed")
        }
    }
}

fn audit_entry(key: &str, value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    map
}

/// Rail reference: fixed prefix, case id, and a truncated random token.
///
/// The token comes from a v4 UUID, so concurrent creations cannot collide
/// through shared counters. Returns the reference and the bare token (the
/// notification guard compares against it later).
pub fn payment_reference(prefix: &str, case_id: i64) -> (String, String) {
    let token = Uuid::new_v4().simple().to_string()[..12].to_string();
    (format!("{}{}-{}", prefix, case_id, token), token)
}

/// The random token is the last `-`-separated segment of a reference.
pub fn reference_token(reference: &str) -> Option<&str> {
    reference.rsplit('-').next().filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn validate_rejects_bad_input() {
        assert!(matches!(
            PaymentRequest::validate(0, "deposit", None),
            Err(PortalError::InvalidExpediente)
        ));
        assert!(matches!(
            PaymentRequest::validate(5, "instalment", None),
            Err(PortalError::InvalidType)
        ));
        assert!(matches!(
            PaymentRequest::validate(5, "deposit", Some("paypal")),
            Err(PortalError::InvalidMethod)
        ));
    }

    #[test]
    fn method_defaults_to_card() {
        let request = PaymentRequest::validate(5, "balance", None).unwrap();
        assert_eq!(request.method, PaymentMethod::Card);
        let request = PaymentRequest::validate(5, "balance", Some("")).unwrap();
        assert_eq!(request.method, PaymentMethod::Card);
        let request = PaymentRequest::validate(5, "balance", Some("bank_transfer")).unwrap();
        assert_eq!(request.method, PaymentMethod::BankTransfer);
    }

    #[test]
    fn reference_embeds_prefix_and_case_id() {
        let (reference, token) = payment_reference("GOLF-", 42);
        assert!(reference.starts_with("GOLF-42-"));
        assert_eq!(token.len(), 12);
        assert_eq!(reference_token(&reference), Some(token.as_str()));
    }

    #[test]
    fn references_do_not_collide() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let (reference, _) = payment_reference("GOLF-", 42);
            assert!(seen.insert(reference), "reference collision");
        }
    }
}
