//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Middleware decorators produce:
//!     → logging.rs (one structured event per request)
//!     → metrics.rs (request count, latency, throughput)
//!     → tracing.rs (request and downstream spans)
//!
//! Consumers:
//!     → stdout (pretty, compact or JSON)
//!     → GET /metrics (Prometheus scrape)
//!     → OTLP/HTTP collector (optional, e.g. Jaeger)
//! ```
//!
//! # Design Decisions
//! - Every handle is built once at startup and injected
//! - No OpenTelemetry globals: the tracer travels with the service chain
//! - Span export is optional to reduce overhead when not needed

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::logging::init_logging;
pub use self::metrics::ServiceMetrics;
pub use self::tracing::{init_tracer_provider, TelemetryError};
