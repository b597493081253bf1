//! vecro-node
//!
//! One node of an emulated microservice application. Every request runs a
//! configurable synthetic workload, then calls the configured peer nodes in
//! order, so a set of nodes forms an arbitrary call graph.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ Tracing ──▶ Instrumenting ──▶ Logging ──┐
//!                                                                             │
//!                          ┌──────────────────────────────────────────────────┘
//!                          ▼
//!                   service::BaseService
//!                     ├─ workload::WorkloadSimulator (delay, CPU, I/O, payload)
//!                     └─ downstream::FanOut ──▶ peer nodes (traceparent injected)
//!
//!     Cross-cutting: config · observability (logs, Prometheus, OTLP) · lifecycle
//! ```

use vecro_node::lifecycle::ServiceVariant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    vecro_node::cli::run(ServiceVariant::Base).await
}
