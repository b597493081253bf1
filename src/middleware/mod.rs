//! Middleware decorators around a service capability.
//!
//! # Data Flow
//! ```text
//! execute(ctx)
//!     → tracing.rs       (request span, child of the inbound trace context)
//!     → instrumenting.rs (request count, latency counter, latency histogram)
//!     → logging.rs       (one event with outcome and duration)
//!     → base service / storage service
//! ```
//!
//! # Design Decisions
//! - Composed once at startup with `tower::ServiceBuilder`; first layer is outermost
//! - Bookkeeping lives in drop guards so it also runs for dropped requests
//! - Results pass through every decorator unchanged

pub mod instrumenting;
pub mod logging;
pub mod tracing;

use std::sync::Arc;

use opentelemetry_sdk::trace::SdkTracer;
use tower::ServiceBuilder;

use crate::observability::ServiceMetrics;
use crate::service::Service;

pub use self::instrumenting::{InstrumentingLayer, InstrumentingService};
pub use self::logging::{LoggingLayer, LoggingService};
pub use self::tracing::{TracingLayer, TracingService};

/// Process-wide observability handles shared by every request.
#[derive(Clone)]
pub struct Telemetry {
    pub tracer: SdkTracer,
    pub span_name: String,
    pub metrics: ServiceMetrics,
    pub service_name: String,
}

/// Wrap `base` in Tracing, Instrumenting and Logging, outermost first.
pub fn compose<S>(base: S, telemetry: &Telemetry) -> Arc<dyn Service>
where
    S: Service + 'static,
{
    let chain = ServiceBuilder::new()
        .layer(TracingLayer::new(
            telemetry.tracer.clone(),
            telemetry.span_name.clone(),
        ))
        .layer(InstrumentingLayer::new(telemetry.metrics.clone()))
        .layer(LoggingLayer::new(telemetry.service_name.as_str()))
        .service(base);
    Arc::new(chain)
}
