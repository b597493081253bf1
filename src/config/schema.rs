//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a node.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for an emulated service node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// Service identity (name, subsystem).
    pub node: NodeIdentity,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Stress parameters applied on every request.
    pub workload: WorkloadConfig,

    /// Downstream peers called on every request.
    pub calls: CallsConfig,

    /// Per-request execution limits.
    pub execution: ExecutionConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Span export settings.
    pub tracing: TracingConfig,

    /// Document store settings (storage-backed variant only).
    pub storage: StorageConfig,
}

/// Identity of the emulated service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeIdentity {
    /// Service name, used as metric label and trace resource name.
    pub name: String,

    /// Subsystem, used as metric name segment.
    pub subsystem: String,
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            subsystem: "subsystem".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Workload stress parameters.
///
/// Immutable once loaded; shared read-only by all requests.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Base delay in milliseconds.
    pub delay_time_ms: u64,

    /// Delay jitter in milliseconds. Defaults to a tenth of the delay.
    pub delay_jitter_ms: Option<u64>,

    /// CPU work units burned per request.
    pub cpu_load: u64,

    /// Simulated I/O wait in milliseconds.
    pub io_load_ms: u64,

    /// Network load; the response payload is half this many bytes.
    pub net_load: u64,

    /// Memory ballast in MiB, allocated once at startup.
    pub memory_mib: u64,

    /// Fixed RNG seed (random when absent).
    pub seed: Option<u64>,
}

impl WorkloadConfig {
    /// Effective jitter in milliseconds.
    pub fn delay_jitter(&self) -> u64 {
        self.delay_jitter_ms.unwrap_or(self.delay_time_ms / 10)
    }
}

/// Downstream call configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CallsConfig {
    /// Peer URLs, called in order on every request.
    pub addresses: Vec<String>,

    /// Per-call HTTP timeout in milliseconds (0 = none).
    pub timeout_ms: u64,
}

/// How finely in-flight work observes cancellation and deadlines.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CancellationGranularity {
    /// Only between major steps (workload, each downstream call).
    Steps,
    /// Also inside delay, CPU, I/O and downstream waits.
    #[default]
    MidFlight,
}

/// Per-request execution limits.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Whole-pipeline timeout in milliseconds (0 = disabled).
    pub timeout_ms: u64,

    /// Where cancellation and the deadline are observed.
    pub granularity: CancellationGranularity,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Expose `/metrics` on the node listener.
    pub metrics_enabled: bool,

    /// Metric name prefix.
    pub metrics_namespace: String,

    /// Interval between exporter upkeep runs, in seconds.
    pub upkeep_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_namespace: "vecro_base".to_string(),
            upkeep_interval_secs: 5,
        }
    }
}

/// Distributed tracing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Export spans to an OTLP collector.
    pub enabled: bool,

    /// OTLP/HTTP traces endpoint.
    pub endpoint: String,

    /// Instrumentation scope name of the tracer.
    pub tracer_name: String,

    /// Name of the span opened per request.
    pub span_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://jaeger-collector:4318/v1/traces".to_string(),
            tracer_name: "vecro-service".to_string(),
            span_name: "BaseRequest".to_string(),
        }
    }
}

/// Which document store backs the storage variant.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongodb,
    Memory,
}

/// Storage-backed variant configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StoreBackend,

    /// Connection string of the document store.
    pub uri: String,

    pub database: String,

    pub collection: String,

    /// Point lookups per request.
    pub read_ops: u64,

    /// Inserts per request.
    pub write_ops: u64,

    /// Lookup ids are drawn from `0..items_count`.
    pub items_count: u64,

    /// Timeout of a single store operation, in seconds.
    pub op_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mongodb,
            uri: "mongodb://localhost:27017".to_string(),
            database: "vecro".to_string(),
            collection: "items".to_string(),
            read_ops: 0,
            write_ops: 0,
            items_count: 100_000,
            op_timeout_secs: 5,
        }
    }
}
