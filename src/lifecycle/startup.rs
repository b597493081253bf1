//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging and the metrics recorder
//! - Allocate the memory ballast
//! - Build the tracer, the leaf service and its decorator chain
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusHandle};
use opentelemetry_sdk::trace::SdkTracerProvider;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::util::TryInitError;

use crate::config::NodeConfig;
use crate::downstream::{DownstreamConfigError, FanOut};
use crate::http::{AppState, NodeServer};
use crate::lifecycle::{signals, Shutdown};
use crate::middleware::{compose, Telemetry};
use crate::observability::metrics::{install_prometheus, run_upkeep};
use crate::observability::tracing::{shutdown_tracer_provider, tracer};
use crate::observability::{init_logging, init_tracer_provider, ServiceMetrics, TelemetryError};
use crate::service::{BaseService, Service};
use crate::storage::{self, StorageService, StoreError};
use crate::workload::{MemoryBallast, WorkloadSimulator};

/// Which service capability sits at the bottom of the decorator chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceVariant {
    /// Workload simulation followed by downstream fan-out.
    Base,
    /// Document store reads and writes.
    Storage,
}

/// Errors that abort startup or serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to initialize logging: {0}")]
    Logging(#[from] TryInitError),

    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] BuildError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Downstream(#[from] DownstreamConfigError),

    #[error("failed to open document store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to allocate {mib} MiB of memory ballast")]
    Ballast { mib: u64 },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("HTTP server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A node accepting traffic on its own task.
#[derive(Debug)]
pub struct RunningNode {
    local_addr: SocketAddr,
    server: JoinHandle<Result<(), std::io::Error>>,
    provider: SdkTracerProvider,
    _ballast: MemoryBallast,
}

impl RunningNode {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `signal` resolves or the server stops on its own, then
    /// shut down gracefully and flush pending spans.
    pub async fn serve_until<F>(self, signal: F, shutdown: &Shutdown) -> Result<(), StartupError>
    where
        F: Future<Output = ()>,
    {
        let RunningNode {
            mut server,
            provider,
            ..
        } = self;

        let served = tokio::select! {
            result = &mut server => result,
            _ = signal => {
                shutdown.trigger();
                server.await
            }
        };

        if let Err(e) = shutdown_tracer_provider(&provider) {
            tracing::warn!(error = %e, "Failed to flush spans");
        }

        served?.map_err(StartupError::Serve)
    }
}

/// Build the node described by `config` and start serving it.
///
/// Metrics are registered with the installed global recorder (a no-op when
/// none is installed). `prometheus` backs the `/metrics` route.
pub async fn spawn_node(
    config: NodeConfig,
    variant: ServiceVariant,
    prometheus: Option<PrometheusHandle>,
    shutdown: &Shutdown,
) -> Result<RunningNode, StartupError> {
    let mib = config.workload.memory_mib;
    let ballast = MemoryBallast::allocate(mib).map_err(|_| StartupError::Ballast { mib })?;
    if !ballast.is_empty() {
        tracing::info!(bytes = ballast.len(), "Memory ballast allocated");
    }

    let provider = init_tracer_provider(&config.tracing, &config.node.name)?;
    let tracer = tracer(&provider, &config.tracing);
    let metrics = ServiceMetrics::register(&config.observability.metrics_namespace, &config.node);
    let telemetry = Telemetry {
        tracer: tracer.clone(),
        span_name: config.tracing.span_name.clone(),
        metrics: metrics.clone(),
        service_name: config.node.name.clone(),
    };

    let service: Arc<dyn Service> = match variant {
        ServiceVariant::Base => {
            let fan_out = FanOut::from_config(&config.calls, &tracer)?;
            tracing::info!(downstreams = ?fan_out.addresses(), "Downstream calls configured");
            let simulator = WorkloadSimulator::new(config.workload.clone());
            compose(BaseService::new(simulator, fan_out), &telemetry)
        }
        ServiceVariant::Storage => {
            let store = storage::connect(&config.storage).await?;
            let leaf = StorageService::new(store, &config.storage, config.workload.seed);
            tracing::info!(
                read_ops = config.storage.read_ops,
                write_ops = config.storage.write_ops,
                "Storage operations configured"
            );
            compose(leaf, &telemetry)
        }
    };
    tracing::debug!(layers = ?service.layers(), "Service chain composed");

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;
    let local_addr = listener.local_addr().map_err(StartupError::Serve)?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let server = NodeServer::new(AppState {
        service,
        metrics,
        prometheus,
        execution: config.execution.clone(),
    });
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()));

    Ok(RunningNode {
        local_addr,
        server,
        provider,
        _ballast: ballast,
    })
}

/// Run a node process until SIGINT or SIGTERM.
pub async fn run_node(config: NodeConfig, variant: ServiceVariant) -> Result<(), StartupError> {
    init_logging(&config.observability)?;

    tracing::info!(
        name = %config.node.name,
        subsystem = %config.node.subsystem,
        bind_address = %config.listener.bind_address,
        variant = ?variant,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();

    let prometheus = if config.observability.metrics_enabled {
        let handle = install_prometheus()?;
        let interval = Duration::from_secs(config.observability.upkeep_interval_secs.max(1));
        tokio::spawn(run_upkeep(handle.clone(), interval, shutdown.subscribe()));
        Some(handle)
    } else {
        None
    };

    let node = spawn_node(config, variant, prometheus, &shutdown).await?;
    node.serve_until(signals::shutdown_signal(), &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
