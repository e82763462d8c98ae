//! Upstream booking-system ("GIAV") client.
//!
//! GIAV answers with loosely-typed records whose field names vary by
//! endpoint generation; responses are kept as `serde_json::Value` and shaped
//! downstream by the normalizer. "Upstream has nothing for this query" is
//! `Ok(None)` / an empty list, distinct from a transport failure.

use crate::config::GiavConfig;
use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct GiavClient {
    client: Client,
    config: GiavConfig,
}

#[derive(Debug, Deserialize)]
struct StageEntry {
    id: i64,
    name: String,
}

impl GiavClient {
    pub fn new(config: GiavConfig) -> Result<Self> {
        let client = Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        !self.config.base_url.is_empty() && !self.config.api_key.expose_secret().is_empty()
    }

    /// All cases ("expedientes") belonging to a customer, as raw records.
    pub async fn cases_for_customer(&self, customer_id: i64) -> Result<Vec<Value>> {
        let url = format!("{}/customers/{}/cases", self.config.base_url, customer_id);
        let response = self.get(&url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("GIAV cases lookup failed: {} - {}", status, body));
        }
        let cases: Vec<Value> = serde_json::from_str(&body)?;
        Ok(cases)
    }

    /// Reservations attached to a case, scoped to the customer.
    pub async fn reservations_for_case(
        &self,
        case_id: i64,
        customer_id: i64,
    ) -> Result<Option<Vec<Value>>> {
        let url = format!(
            "{}/cases/{}/reservations?customer={}",
            self.config.base_url, case_id, customer_id
        );
        let response = self.get(&url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!(
                "GIAV reservations lookup failed: {} - {}",
                status,
                body
            ));
        }
        let reservations: Vec<Value> = serde_json::from_str(&body)?;
        if reservations.is_empty() {
            return Ok(None);
        }
        Ok(Some(reservations))
    }

    /// Payment calculation over a case's reservations.
    pub async fn calculate_payment(
        &self,
        case_id: i64,
        customer_id: i64,
        reservations: &[Value],
    ) -> Result<Option<Value>> {
        let url = format!(
            "{}/cases/{}/payment-calculation",
            self.config.base_url, case_id
        );
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .json(&serde_json::json!({
                "customer_id": customer_id,
                "reservations": reservations,
            }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!(
                "GIAV payment calculation failed: {} - {}",
                status,
                body
            ));
        }
        let calc: Value = serde_json::from_str(&body)?;
        if calc.is_null() {
            return Ok(None);
        }
        Ok(Some(calc))
    }

    /// Stage-name table for an entity type, keyed by numeric stage id.
    pub async fn stage_names(&self, entity: &str) -> Result<HashMap<i64, String>> {
        let url = format!("{}/stages/{}", self.config.base_url, entity);
        let response = self.get(&url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(HashMap::new());
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("GIAV stage lookup failed: {} - {}", status, body));
        }
        let entries: Vec<StageEntry> = serde_json::from_str(&body)?;
        Ok(entries.into_iter().map(|e| (e.id, e.name)).collect())
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .send()
            .await?)
    }
}
