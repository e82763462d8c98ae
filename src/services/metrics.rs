use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static PAYMENT_INTENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PAYMENT_AMOUNT_CENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    let registry = Registry::new();

    let intents_counter = IntCounterVec::new(
        Opts::new(
            "portal_payment_intents_total",
            "Payment intent lifecycle events by status",
        ),
        &["status"],
    )
    .expect("Failed to create portal_payment_intents_total metric");

    let amount_counter = IntCounterVec::new(
        Opts::new(
            "portal_payment_amount_cents_total",
            "Requested payment amounts by currency, in minor units",
        ),
        &["currency"],
    )
    .expect("Failed to create portal_payment_amount_cents_total metric");

    registry
        .register(Box::new(intents_counter.clone()))
        .expect("Failed to register portal_payment_intents_total");
    registry
        .register(Box::new(amount_counter.clone()))
        .expect("Failed to register portal_payment_amount_cents_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    PAYMENT_INTENTS_TOTAL
        .set(intents_counter)
        .expect("Failed to set portal_payment_intents_total");
    PAYMENT_AMOUNT_CENTS_TOTAL
        .set(amount_counter)
        .expect("Failed to set portal_payment_amount_cents_total");
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Record an intent lifecycle event.
pub fn record_intent(status: &str) {
    if let Some(counter) = PAYMENT_INTENTS_TOTAL.get() {
        counter.with_label_values(&[status]).inc();
    }
}

/// Record a requested amount in minor units.
pub fn record_amount(currency: &str, amount_cents: u64) {
    if let Some(counter) = PAYMENT_AMOUNT_CENTS_TOTAL.get() {
        counter.with_label_values(&[currency]).inc_by(amount_cents);
    }
}
