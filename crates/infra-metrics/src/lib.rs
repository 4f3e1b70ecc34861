//! Qafka Infrastructure - Prometheus metrics
//!
//! `PrometheusMetricsSink` forwards engine observations to the global
//! `metrics` recorder; `install_prometheus_exporter` installs that recorder
//! with an HTTP scrape endpoint.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use qafka_core::error::{AppError, Result};
use qafka_core::port::MetricsSink;
use std::net::SocketAddr;
use tracing::info;

pub const MESSAGES_TOTAL: &str = "qafka_messages_total";
pub const QUEUE_DEPTH: &str = "qafka_queue_depth";
pub const PROCESSING_DURATION_SECONDS: &str = "qafka_message_processing_duration_seconds";

/// Processing time buckets (seconds)
const PROCESSING_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Metrics sink backed by the `metrics` facade
#[derive(Debug, Clone, Default)]
pub struct PrometheusMetricsSink;

impl PrometheusMetricsSink {
    pub fn new() -> Self {
        describe_counter!(MESSAGES_TOTAL, "Message lifecycle events by queue and status");
        describe_gauge!(QUEUE_DEPTH, "Messages currently held by a queue, per status");
        describe_histogram!(
            PROCESSING_DURATION_SECONDS,
            Unit::Seconds,
            "Time from dispatch claim to reported outcome"
        );
        Self
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn increment_message_counter(&self, queue_name: &str, status: &str) {
        counter!(
            MESSAGES_TOTAL,
            "queue_name" => queue_name.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
    }

    fn set_queue_depth(&self, queue_name: &str, status: &str, depth: f64) {
        gauge!(
            QUEUE_DEPTH,
            "queue_name" => queue_name.to_string(),
            "status" => status.to_string()
        )
        .set(depth);
    }

    fn observe_processing_time(&self, queue_name: &str, seconds: f64) {
        histogram!(PROCESSING_DURATION_SECONDS, "queue_name" => queue_name.to_string())
            .record(seconds);
    }
}

fn builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(PROCESSING_DURATION_SECONDS.to_string()),
            PROCESSING_BUCKETS,
        )
        .map_err(|e| AppError::Internal(format!("Invalid histogram buckets: {}", e)))
}

/// Install the global Prometheus recorder with an HTTP listener on `addr`
///
/// Must be called from within a Tokio runtime.
pub fn install_prometheus_exporter(addr: SocketAddr) -> Result<()> {
    builder()?
        .with_http_listener(addr)
        .install()
        .map_err(|e| AppError::Internal(format!("Failed to install Prometheus exporter: {}", e)))?;

    info!(addr = %addr, "Prometheus exporter listening");
    Ok(())
}
