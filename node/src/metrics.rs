//! # Prometheus Metrics
//!
//! Operational metrics for the bank node, scraped at the `/metrics` HTTP
//! endpoint on the configured metrics port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] so they do
//! not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are internally shared) so it can
/// be passed to request handlers and background tasks alike.
#[derive(Clone)]
pub struct BankMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total successful deposits (native, token, and conversion).
    pub deposits_total: IntCounter,
    /// Total successful withdrawals.
    pub withdrawals_total: IntCounter,
    /// Total successful conversion deposits (also counted in deposits).
    pub conversions_total: IntCounter,
    /// Total operations rejected for any reason.
    pub operations_rejected_total: IntCounter,
    /// Aggregate canonical value held, in canonical (6-decimal) units.
    pub total_value_canonical: IntGauge,
    /// Histogram of end-to-end operation latency in seconds.
    pub operation_latency_seconds: Histogram,
}

impl BankMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("aurum".into()), None)
            .expect("failed to create prometheus registry");

        let deposits_total = IntCounter::new(
            "deposits_total",
            "Total number of successful deposit operations",
        )
        .expect("metric creation");
        registry
            .register(Box::new(deposits_total.clone()))
            .expect("metric registration");

        let withdrawals_total = IntCounter::new(
            "withdrawals_total",
            "Total number of successful withdrawal operations",
        )
        .expect("metric creation");
        registry
            .register(Box::new(withdrawals_total.clone()))
            .expect("metric registration");

        let conversions_total = IntCounter::new(
            "conversions_total",
            "Total number of successful conversion deposits",
        )
        .expect("metric creation");
        registry
            .register(Box::new(conversions_total.clone()))
            .expect("metric registration");

        let operations_rejected_total = IntCounter::new(
            "operations_rejected_total",
            "Total number of operations rejected for any reason",
        )
        .expect("metric creation");
        registry
            .register(Box::new(operations_rejected_total.clone()))
            .expect("metric registration");

        let total_value_canonical = IntGauge::new(
            "total_value_canonical",
            "Aggregate canonical value held by the bank (6-decimal units)",
        )
        .expect("metric creation");
        registry
            .register(Box::new(total_value_canonical.clone()))
            .expect("metric registration");

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "End-to-end operation latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(operation_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            deposits_total,
            withdrawals_total,
            conversions_total,
            operations_rejected_total,
            total_value_canonical,
            operation_latency_seconds,
        }
    }

    /// Updates the total-value gauge, saturating into the i64 range the
    /// exposition format requires.
    pub fn set_total_value(&self, value: u128) {
        self.total_value_canonical
            .set(value.min(i64::MAX as u128) as i64);
    }

    /// Encodes all registered metrics into the Prometheus text
    /// exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for BankMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<BankMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
