//! Distributed tracing support.
//!
//! # Responsibilities
//! - Build the OpenTelemetry tracer provider for this node
//! - Export finished spans to an OTLP/HTTP collector when enabled
//! - Flush pending spans on shutdown
//!
//! # Design Decisions
//! - Export is optional and disabled by default
//! - The provider is returned to the caller, never installed globally
//! - W3C Trace Context propagation lives in `http::propagation`

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{ExporterBuildError, WithExportConfig};
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use thiserror::Error;

use crate::config::TracingConfig;

/// Errors setting up or tearing down span export.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(#[from] ExporterBuildError),

    #[error("failed to shut down tracer provider: {0}")]
    Shutdown(String),
}

/// Build the tracer provider. Spans carry `service.name = service_name`.
pub fn init_tracer_provider(
    config: &TracingConfig,
    service_name: &str,
) -> Result<SdkTracerProvider, TelemetryError> {
    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();
    let mut builder = SdkTracerProvider::builder().with_resource(resource);

    if config.enabled {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(config.endpoint.clone())
            .build()?;
        builder = builder.with_batch_exporter(exporter);
        tracing::info!(endpoint = %config.endpoint, "OTLP span export enabled");
    } else {
        tracing::debug!("Span export disabled");
    }

    Ok(builder.build())
}

/// The tracer used for request and downstream spans.
pub fn tracer(provider: &SdkTracerProvider, config: &TracingConfig) -> SdkTracer {
    provider.tracer(config.tracer_name.clone())
}

/// Flush and stop the provider.
pub fn shutdown_tracer_provider(provider: &SdkTracerProvider) -> Result<(), TelemetryError> {
    provider
        .shutdown()
        .map_err(|e| TelemetryError::Shutdown(e.to_string()))
}
