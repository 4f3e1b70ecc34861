//! OpenTelemetry trace export
//!
//! Active only when built with the `telemetry` feature and
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set:
//!
//! ```text
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
//! OTEL_SERVICE_NAME=qafka-dev \
//!     ./qafka
//! ```

use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the OpenTelemetry tracing layer, if configured
pub fn init_telemetry() -> Result<Option<BoxedLayer>> {
    let endpoint = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => endpoint,
        Err(_) => return Ok(None),
    };

    build_layer(&endpoint)
}

/// Flush pending spans
pub fn shutdown_telemetry() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(not(feature = "telemetry"))]
fn build_layer(endpoint: &str) -> Result<Option<BoxedLayer>> {
    // Subscriber is not installed yet
    eprintln!(
        "OTEL_EXPORTER_OTLP_ENDPOINT={} ignored: built without feature 'telemetry'",
        endpoint
    );
    Ok(None)
}

#[cfg(feature = "telemetry")]
fn build_layer(endpoint: &str) -> Result<Option<BoxedLayer>> {
    use anyhow::Context;
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "qafka".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to build OTLP span exporter")?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.clone(),
        )]))
        .build();

    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(Some(tracing_opentelemetry::layer().with_tracer(tracer).boxed()))
}
