//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Register the node's metric handles once at startup
//! - Record per-request latency and response throughput
//! - Build the Prometheus recorder served on `/metrics`
//!
//! # Metrics
//! - `<ns>_<subsystem>_request_count` (counter): requests executed
//! - `<ns>_<subsystem>_latency_counter` (gauge, only increases): cumulative seconds
//! - `<ns>_<subsystem>_latency_histogram` (histogram): per-request seconds
//! - `<ns>_<subsystem>_throughput` (counter): response bytes sent
//!
//! Every series carries the `vecrosim_service_name` label.
//!
//! # Design Decisions
//! - Handles are resolved once and injected, so tests can bind them to a local recorder
//! - `metrics` counters are integral, so cumulative seconds live in a gauge
//! - Histogram buckets span 200µs to 25s

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics::{Counter, Gauge, Histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::sync::broadcast;

use crate::config::NodeIdentity;

/// Label attached to every series.
pub const SERVICE_NAME_LABEL: &str = "vecrosim_service_name";

/// Latency histogram buckets, in seconds.
pub const LATENCY_BUCKETS: [f64; 15] = [
    0.0002, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 25.0,
];

const LATENCY_HISTOGRAM_SUFFIX: &str = "latency_histogram";

/// `metrics` counters are integral, so the fractional running total is
/// exported with gauge type. It never decreases, so `rate()` applies.
const LATENCY_COUNTER_HELP: &str = "Processing time taken of requests in seconds, as counter. \
    Exported as a gauge that only increases; use rate() as with a counter.";

/// Fully-qualified metric names of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricNames {
    pub request_count: String,
    pub latency_counter: String,
    pub latency_histogram: String,
    pub throughput: String,
}

impl MetricNames {
    pub fn new(namespace: &str, subsystem: &str) -> Self {
        let prefix = format!("{}_{}", namespace, subsystem);
        Self {
            request_count: format!("{}_request_count", prefix),
            latency_counter: format!("{}_latency_counter", prefix),
            latency_histogram: format!("{}_{}", prefix, LATENCY_HISTOGRAM_SUFFIX),
            throughput: format!("{}_throughput", prefix),
        }
    }
}

/// Metric handles shared by every request.
#[derive(Clone)]
pub struct ServiceMetrics {
    request_count: Counter,
    latency_counter: Gauge,
    latency_histogram: Histogram,
    throughput: Counter,
}

impl ServiceMetrics {
    /// Register the node's series with the current recorder.
    pub fn register(namespace: &str, node: &NodeIdentity) -> Self {
        let names = MetricNames::new(namespace, &node.subsystem);

        describe_counter!(names.request_count.clone(), "Number of requests received.");
        describe_gauge!(
            names.latency_counter.clone(),
            Unit::Seconds,
            LATENCY_COUNTER_HELP
        );
        describe_histogram!(
            names.latency_histogram.clone(),
            Unit::Seconds,
            "Processing time taken of requests in seconds, as histogram."
        );
        describe_counter!(
            names.throughput.clone(),
            Unit::Bytes,
            "Size of data transmitted in bytes."
        );

        let service = node.name.clone();
        Self {
            request_count: counter!(names.request_count, SERVICE_NAME_LABEL => service.clone()),
            latency_counter: gauge!(names.latency_counter, SERVICE_NAME_LABEL => service.clone()),
            latency_histogram: histogram!(names.latency_histogram, SERVICE_NAME_LABEL => service.clone()),
            throughput: counter!(names.throughput, SERVICE_NAME_LABEL => service),
        }
    }

    /// Record one finished request.
    pub fn record_request(&self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        self.request_count.increment(1);
        self.latency_counter.increment(seconds);
        self.latency_histogram.record(seconds);
    }

    /// Record the size of one encoded response.
    pub fn record_throughput(&self, bytes: usize) {
        self.throughput.increment(bytes as u64);
    }
}

/// Prometheus builder with the node's histogram buckets.
pub fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Suffix(LATENCY_HISTOGRAM_SUFFIX.to_string()),
        &LATENCY_BUCKETS,
    )
}

/// Install the Prometheus recorder globally and return its render handle.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = prometheus_builder()?.install_recorder()?;
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Periodically drain histogram buffers until shutdown.
pub async fn run_upkeep(
    handle: PrometheusHandle,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => handle.run_upkeep(),
            _ = shutdown.recv() => {
                tracing::debug!("Metrics upkeep stopping");
                break;
            }
        }
    }
}
