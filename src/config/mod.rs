use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub giav: GiavConfig,
    pub inespay: InespayConfig,
    pub payments: PaymentsConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

/// Upstream booking-system ("GIAV") API.
#[derive(Deserialize, Clone, Debug)]
pub struct GiavConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
}

/// Bank-transfer rail credentials. Empty values mean the rail is not
/// available in this environment.
#[derive(Deserialize, Clone, Debug)]
pub struct InespayConfig {
    pub base_url: String,
    pub api_token: Secret<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PaymentsConfig {
    pub currency: String,
    /// Prefix for rail references, e.g. "GOLF-".
    pub reference_prefix: String,
    /// Concept line shown to the payer by the rail.
    pub subject: String,
    /// Pre-existing card payment page; `None` disables the card method.
    pub pay_url: Option<String>,
    /// Portal page the payer lands on after the rail redirects back.
    pub return_url: String,
    /// Publicly reachable URL of this service's notification endpoint.
    pub notify_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("PORTAL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORTAL_PORT")
            .unwrap_or_else(|_| "3010".to_string())
            .parse()?;

        let db_url = env::var("PORTAL_DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name = env::var("PORTAL_DATABASE_NAME").unwrap_or_else(|_| "portal_db".to_string());

        let giav_base_url = env::var("GIAV_BASE_URL").unwrap_or_default();
        let giav_api_key = env::var("GIAV_API_KEY").unwrap_or_default();

        let inespay_base_url = env::var("INESPAY_BASE_URL").unwrap_or_default();
        let inespay_api_token = env::var("INESPAY_API_TOKEN").unwrap_or_default();

        let currency = env::var("PORTAL_CURRENCY").unwrap_or_else(|_| "EUR".to_string());
        let reference_prefix =
            env::var("PORTAL_REFERENCE_PREFIX").unwrap_or_else(|_| "GOLF-".to_string());
        let subject =
            env::var("PORTAL_PAYMENT_SUBJECT").unwrap_or_else(|_| "Golf travel booking".to_string());
        let pay_url = env::var("PORTAL_CARD_PAY_URL").ok().filter(|v| !v.is_empty());
        let return_url = env::var("PORTAL_RETURN_URL")
            .unwrap_or_else(|_| "https://portal.example.com/payments/result".to_string());
        let notify_url = env::var("PORTAL_NOTIFY_URL")
            .unwrap_or_else(|_| "https://portal.example.com/api/payments/inespay/notify".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            giav: GiavConfig {
                base_url: giav_base_url,
                api_key: Secret::new(giav_api_key),
            },
            inespay: InespayConfig {
                base_url: inespay_base_url,
                api_token: Secret::new(inespay_api_token),
            },
            payments: PaymentsConfig {
                currency,
                reference_prefix,
                subject,
                pay_url,
                return_url,
                notify_url,
            },
            service_name: "golf-portal-service".to_string(),
        })
    }
}
