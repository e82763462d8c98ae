//! Bank-transfer rail client (Inespay-style single pay-ins).
//!
//! The rail is a synchronous HTTP API: one call creates a single pay-in and
//! returns a redirect URL for the payer. The request carries the same three
//! callback URLs under two naming conventions because deployed rail versions
//! read different fields; both sets must always be populated identically.

use crate::config::InespayConfig;
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

const RAIL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct InespayClient {
    client: Client,
    config: InespayConfig,
}

/// Request body for the "create single payment" operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinglePayinRequest {
    /// Amount in minor units (cents).
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub subject: String,
    pub reference: String,
    // Legacy field names.
    pub url_ok: String,
    pub url_ko: String,
    pub url_notif: String,
    // Current field names for the same three targets.
    pub success_link_redirect: String,
    pub failure_link_redirect: String,
    pub notification_url: String,
    /// Base64-encoded JSON blob the rail echoes back on notification.
    pub custom_data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinglePayinResponse {
    pub single_payin_id: Option<String>,
    pub url: Option<String>,
    pub pay_url: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
}

impl SinglePayinResponse {
    /// Redirect URL for the payer, wherever the rail put it.
    pub fn redirect_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.pay_url.as_deref().filter(|u| !u.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct RailErrorBody {
    status: Option<String>,
    description: Option<String>,
}

/// Opaque context embedded in `custom_data`, echoed back on notification.
#[derive(Debug, Serialize, Deserialize)]
pub struct RailCustomData {
    pub intent_id: Uuid,
    pub token: String,
    pub case_id: i64,
    pub customer_id: i64,
    pub payer_name: Option<String>,
}

impl RailCustomData {
    pub fn encode(&self) -> Result<String> {
        Ok(BASE64.encode(serde_json::to_vec(self)?))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = BASE64.decode(encoded.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl InespayClient {
    pub fn new(config: InespayConfig) -> Result<Self> {
        let client = Client::builder().timeout(RAIL_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// Whether the rail is available in this environment.
    pub fn is_configured(&self) -> bool {
        !self.config.base_url.is_empty() && !self.config.api_token.expose_secret().is_empty()
    }

    /// Create a single pay-in. A timeout counts as a rail failure.
    pub async fn create_single_payment(
        &self,
        request: &SinglePayinRequest,
    ) -> Result<SinglePayinResponse> {
        if !self.is_configured() {
            return Err(anyhow!("bank transfer rail credentials not configured"));
        }

        let url = format!("{}/payins/single", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_token.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body = %body, "rail create_single_payment response");

        if status.is_success() {
            let payin: SinglePayinResponse = serde_json::from_str(&body)?;
            tracing::info!(
                single_payin_id = ?payin.single_payin_id,
                reference = %request.reference,
                "single pay-in created"
            );
            Ok(payin)
        } else {
            let error: RailErrorBody = serde_json::from_str(&body).unwrap_or(RailErrorBody {
                status: None,
                description: Some(body.clone()),
            });
            tracing::error!(
                status = ?error.status,
                description = ?error.description,
                reference = %request.reference,
                "single pay-in creation failed"
            );
            Err(anyhow!(
                "rail error: {} - {}",
                error.status.unwrap_or_else(|| status.to_string()),
                error.description.unwrap_or_default()
            ))
        }
    }
}
