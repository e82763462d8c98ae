use golf_portal_service::config::{
    Config, DatabaseConfig, GiavConfig, InespayConfig, PaymentsConfig, ServerConfig,
};
use golf_portal_service::models::PaymentIntent;
use golf_portal_service::Application;
use secrecy::Secret;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_USER_ID: &str = "user-1";
pub const TEST_CUSTOMER_ID: i64 = 7;
pub const CARD_PAY_URL: &str = "https://pay.example.com/checkout";

pub struct TestApp {
    pub address: String,
    pub db: mongodb::Database,
    pub db_name: String,
    pub giav: MockServer,
    pub inespay: MockServer,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(true).await
    }

    /// Environment without bank-transfer rail credentials.
    pub async fn spawn_without_inespay() -> Self {
        Self::spawn_with(false).await
    }

    async fn spawn_with(inespay_configured: bool) -> Self {
        let giav = MockServer::start().await;
        let inespay = MockServer::start().await;

        let db_name = format!("portal_test_{}", uuid::Uuid::new_v4().simple());

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new(
                    std::env::var("TEST_MONGODB_URI")
                        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                ),
                db_name: db_name.clone(),
            },
            giav: GiavConfig {
                base_url: giav.uri(),
                api_key: Secret::new("test-giav-key".to_string()),
            },
            inespay: InespayConfig {
                base_url: if inespay_configured {
                    inespay.uri()
                } else {
                    String::new()
                },
                api_token: Secret::new(if inespay_configured {
                    "test-inespay-token".to_string()
                } else {
                    String::new()
                }),
            },
            payments: PaymentsConfig {
                currency: "EUR".to_string(),
                reference_prefix: "GOLF-".to_string(),
                subject: "Golf travel booking".to_string(),
                pay_url: Some(CARD_PAY_URL.to_string()),
                return_url: "https://portal.example.com/payments/result".to_string(),
                notify_url: "https://portal.example.com/api/payments/inespay/notify".to_string(),
            },
            service_name: "golf-portal-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let db = app.db().clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept requests.
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            db,
            db_name,
            giav,
            inespay,
            client,
        }
    }

    /// `POST /payments/intent` as the default linked customer.
    pub async fn post_intent(&self, body: serde_json::Value) -> reqwest::Response {
        self.post_intent_as(TEST_CUSTOMER_ID, body).await
    }

    pub async fn post_intent_as(
        &self,
        customer_id: i64,
        body: serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(format!("{}/payments/intent", self.address))
            .header("X-User-ID", TEST_USER_ID)
            .header("X-Customer-ID", customer_id.to_string())
            .header("X-Customer-Name", "A. Golfer")
            .json(&body)
            .send()
            .await
            .expect("Failed to send intent request")
    }

    /// `GET /payments/intents/:id` as a given customer.
    pub async fn get_intent_as(&self, customer_id: i64, intent_id: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/payments/intents/{}", self.address, intent_id))
            .header("X-User-ID", TEST_USER_ID)
            .header("X-Customer-ID", customer_id.to_string())
            .send()
            .await
            .expect("Failed to send intent lookup")
    }

    pub async fn get_cases(&self) -> reqwest::Response {
        self.client
            .get(format!("{}/cases", self.address))
            .header("X-User-ID", TEST_USER_ID)
            .header("X-Customer-ID", TEST_CUSTOMER_ID.to_string())
            .send()
            .await
            .expect("Failed to send cases request")
    }

    /// Mount GIAV reservation + payment-calculation doubles for a case.
    pub async fn mount_eligibility(&self, case_id: i64, calc: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/cases/{}/reservations", case_id)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "IdReserva": 1 }])),
            )
            .mount(&self.giav)
            .await;

        Mock::given(method("POST"))
            .and(path(format!("/cases/{}/payment-calculation", case_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(calc))
            .mount(&self.giav)
            .await;
    }

    pub fn intents(&self) -> mongodb::Collection<PaymentIntent> {
        self.db.collection("payment_intents")
    }

    pub async fn intent_count(&self) -> u64 {
        self.intents()
            .count_documents(mongodb::bson::doc! {}, None)
            .await
            .expect("Failed to count intents")
    }

    pub async fn cleanup(&self) {
        self.db
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}
