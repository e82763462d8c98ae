use chrono::NaiveDate;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One attempt to collect a payment for a case via a specific rail.
///
/// Intents are append-only audit records: they are never deleted, and the
/// `payload` field only grows (per-key merge, see the repository).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentIntent {
    #[serde(rename = "_id", with = "uuid::serde::hyphenated")]
    pub id: Uuid,
    pub user_id: String,
    pub customer_id: i64,
    pub case_id: i64,
    pub amount: f64,
    pub currency: String,
    pub provider: PaymentProvider,
    pub method: PaymentMethod,
    /// Client-generated reference sent to the rail: prefix + case id + random token.
    pub reference: String,
    /// Payment id assigned by the rail, once it has responded.
    pub provider_payment_id: Option<String>,
    pub status: IntentStatus,
    /// Structured audit log keyed by step name (`init`, `inespay_init`, `inespay_notify`, ...).
    pub payload: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    Created,
    Initiated,
    Completed,
    Failed,
}

impl IntentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, IntentStatus::Completed | IntentStatus::Failed)
    }

    /// Transition table for the intent lifecycle. Only forward transitions
    /// are valid; `Failed` is reachable from both non-terminal states.
    pub fn can_transition_to(self, next: IntentStatus) -> bool {
        use IntentStatus::*;
        matches!(
            (self, next),
            (Created, Initiated) | (Created, Failed) | (Initiated, Completed) | (Initiated, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentStatus::Created => "created",
            IntentStatus::Initiated => "initiated",
            IntentStatus::Completed => "completed",
            IntentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    #[serde(rename = "card-gateway")]
    CardGateway,
    #[serde(rename = "bank-transfer-gateway")]
    BankTransferGateway,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Deposit,
    Balance,
}

impl PaymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentType::Deposit => "deposit",
            PaymentType::Balance => "balance",
        }
    }

    /// `mode` query value understood by the card payment page.
    pub fn card_mode(self) -> &'static str {
        match self {
            PaymentType::Deposit => "deposit",
            PaymentType::Balance => "full",
        }
    }
}

impl FromStr for PaymentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(PaymentType::Deposit),
            "balance" => Ok(PaymentType::Balance),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment figures for a case, computed from upstream reservation data.
///
/// All monetary values are non-negative. `pending` prefers the upstream
/// "real pending" figure over `total - paid` when both are present.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PaymentSummary {
    pub total: f64,
    pub paid: f64,
    pub pending: f64,
    /// Deposit ("señal") requested by the agency for this case.
    pub deposit: f64,
    pub is_paid: bool,
    pub currency: String,
}

/// Stable client-facing shape for an upstream case ("expediente") record.
#[derive(Debug, Serialize, Clone)]
pub struct NormalizedCase {
    /// `0` means the upstream record carried no resolvable identifier.
    pub id: i64,
    pub code: String,
    pub title: String,
    /// Empty string means "unknown", not a business status.
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Human-readable range, only when both dates are known.
    pub date_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentSummary>,
    /// `None` when pending could not be computed; "unknown" is a distinct
    /// user-facing state from "no bonus".
    pub bonus_available: Option<bool>,
}
