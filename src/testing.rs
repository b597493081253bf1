//! Shared test doubles.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use opentelemetry::trace::{SpanId, TraceContextExt, TracerProvider as _};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracer, SdkTracerProvider};
use tracing_subscriber::fmt::MakeWriter;

use crate::context::ExecutionContext;
use crate::downstream::Downstream;
use crate::error::ServiceResult;
use crate::service::Service;

/// Tracer whose finished spans land in the returned exporter.
pub fn in_memory_tracer() -> (SdkTracerProvider, InMemorySpanExporter, SdkTracer) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let tracer = provider.tracer("vecro-test");
    (provider, exporter, tracer)
}

/// Records which downstreams were invoked and under which span.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<(String, SpanId)>>>,
}

impl CallLog {
    fn record(&self, address: &str, span_id: SpanId) {
        self.entries
            .lock()
            .unwrap()
            .push((address.to_string(), span_id));
    }

    pub fn calls(&self) -> Vec<String> {
        self.entries.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
    }

    pub fn span_ids(&self) -> Vec<SpanId> {
        self.entries.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }
}

/// Downstream that answers with a fixed outcome.
pub struct ScriptedDownstream {
    address: String,
    outcome: ServiceResult<()>,
    log: CallLog,
}

impl ScriptedDownstream {
    pub fn new(address: impl Into<String>, outcome: ServiceResult<()>, log: CallLog) -> Self {
        Self {
            address: address.into(),
            outcome,
            log,
        }
    }
}

#[async_trait]
impl Downstream for ScriptedDownstream {
    fn address(&self) -> &str {
        &self.address
    }

    async fn call(&self, ctx: &ExecutionContext) -> ServiceResult<()> {
        let span_id = ctx.trace().span().span_context().span_id();
        self.log.record(&self.address, span_id);
        self.outcome.clone()
    }
}

/// Service that returns a fixed outcome.
pub struct StaticService {
    outcome: ServiceResult<String>,
}

impl StaticService {
    pub fn new(outcome: ServiceResult<String>) -> Self {
        Self { outcome }
    }
}

#[async_trait]
impl Service for StaticService {
    async fn execute(&self, _ctx: &ExecutionContext) -> ServiceResult<String> {
        self.outcome.clone()
    }

    fn layers(&self) -> Vec<&'static str> {
        vec!["static"]
    }
}

/// Service that never completes, for dropped-request tests.
pub struct PendingService;

#[async_trait]
impl Service for PendingService {
    async fn execute(&self, _ctx: &ExecutionContext) -> ServiceResult<String> {
        std::future::pending().await
    }

    fn layers(&self) -> Vec<&'static str> {
        vec!["pending"]
    }
}

/// In-memory log sink for `tracing_subscriber::fmt`.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Captured output, one event per line.
    pub fn lines(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Install a JSON subscriber writing here for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
