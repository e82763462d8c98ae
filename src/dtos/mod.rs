use crate::models::{IntentStatus, NormalizedCase, PaymentIntent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /payments/intent`. Type and method arrive as raw strings
/// so rejections map to the portal's own error codes instead of generic
/// deserialization failures.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub expediente_id: i64,
    #[serde(rename = "type")]
    pub payment_type: String,
    pub method: Option<String>,
}

/// Success envelope for a payment request: where to send the payer.
#[derive(Debug, Serialize)]
pub struct PaymentRedirectResponse {
    pub ok: bool,
    pub redirect_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<Uuid>,
}

/// Notification callback from the bank-transfer rail. Field names vary by
/// rail version; aliases cover both conventions.
#[derive(Debug, Deserialize)]
pub struct InespayNotification {
    #[serde(alias = "singlePayinId", default)]
    pub single_payin_id: Option<String>,
    #[serde(alias = "codStatus", default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(alias = "customData", default)]
    pub custom_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotificationAck {
    pub ok: bool,
    pub status: IntentStatus,
}

/// Client-facing view of an intent, for polling after the redirect.
#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub id: Uuid,
    pub case_id: i64,
    pub amount: f64,
    pub currency: String,
    pub status: IntentStatus,
    pub reference: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PaymentIntent> for IntentResponse {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            id: intent.id,
            case_id: intent.case_id,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
            reference: intent.reference,
            created_at: intent.created_at.to_string(),
            updated_at: intent.updated_at.to_string(),
        }
    }
}

/// Listing envelope. Upstream failures degrade instead of erroring: the
/// client always receives a structurally complete payload, with the raw
/// error string surfaced for operator debugging.
#[derive(Debug, Serialize)]
pub struct CaseListResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cases: Vec<NormalizedCase>,
}

impl CaseListResponse {
    pub fn ok(cases: Vec<NormalizedCase>) -> Self {
        Self {
            status: "ok",
            error: None,
            cases,
        }
    }

    pub fn degraded(error: String) -> Self {
        Self {
            status: "degraded",
            error: Some(error),
            cases: Vec::new(),
        }
    }
}
