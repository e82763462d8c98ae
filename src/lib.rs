pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Config;
use middleware::metrics::metrics_middleware;
use middleware::request_id::request_id_middleware;
use services::{GiavClient, InespayClient, IntentRepository};

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub config: Config,
    pub repository: IntentRepository,
    pub giav: GiavClient,
    pub inespay: InespayClient,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    db: mongodb::Database,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let repository = IntentRepository::new(&db);
        repository.init_indexes().await?;

        let giav = GiavClient::new(config.giav.clone())?;
        if !giav.is_configured() {
            tracing::warn!("GIAV credentials not configured - case data will be unavailable");
        }

        let inespay = InespayClient::new(config.inespay.clone())?;
        if inespay.is_configured() {
            tracing::info!("bank transfer rail client initialized");
        } else {
            tracing::warn!(
                "bank transfer rail credentials not configured - bank transfer payments disabled"
            );
        }

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            repository,
            giav,
            inespay,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            // Case listing (normalized upstream records)
            .route("/cases", get(handlers::cases::list_cases))
            // Payment endpoints
            .route("/payments/intent", post(handlers::payments::create_payment_intent))
            .route("/payments/intents/:id", get(handlers::payments::get_intent))
            .route(
                "/payments/inespay/notify",
                post(handlers::payments::inespay_notify),
            )
            .layer(CorsLayer::permissive())
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        user_id = tracing::field::Empty,
                        customer_id = tracing::field::Empty,
                    )
                }),
            )
            .with_state(state);

        // Port 0 binds a random port, used by the test harness.
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
            db,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("listening on port {}", self.port);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
