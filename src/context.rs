//! Per-request execution context.
//!
//! Carries the cancellation signal, the optional deadline and the trace
//! context through every service, decorator and downstream call. Nothing in
//! the pipeline reads ambient or thread-local state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use opentelemetry::Context;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::CancellationGranularity;
use crate::error::{ServiceError, ServiceResult};

/// Context threaded through one request's execution.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    trace: Context,
    carrier: Option<Arc<HeaderMap>>,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    granularity: CancellationGranularity,
}

impl ExecutionContext {
    /// A root context: no parent span, no deadline.
    pub fn new() -> Self {
        Self {
            trace: Context::new(),
            carrier: None,
            cancellation: CancellationToken::new(),
            deadline: None,
            granularity: CancellationGranularity::default(),
        }
    }

    /// A context for a request that arrived over the wire.
    ///
    /// The headers are kept as the inbound trace carrier until a local span
    /// is opened.
    pub fn from_headers(headers: HeaderMap) -> Self {
        Self {
            carrier: Some(Arc::new(headers)),
            ..Self::new()
        }
    }

    /// Set a deadline `timeout` from now. `None` leaves the request unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(|t| Instant::now() + t);
        self
    }

    pub fn with_granularity(mut self, granularity: CancellationGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Bind the request to a caller-owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Derive a context whose current span lives in `trace`.
    ///
    /// The inbound carrier is dropped: once a local span exists, it is the
    /// parent of everything below.
    pub fn with_trace(&self, trace: Context) -> Self {
        Self {
            trace,
            carrier: None,
            ..self.clone()
        }
    }

    /// Current OpenTelemetry context.
    pub fn trace(&self) -> &Context {
        &self.trace
    }

    /// Inbound request headers, if the request arrived over the wire and no
    /// local span has been opened yet.
    pub fn inbound_headers(&self) -> Option<&HeaderMap> {
        self.carrier.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn granularity(&self) -> CancellationGranularity {
        self.granularity
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Fail if the request was cancelled or its deadline has passed.
    ///
    /// Called between major steps regardless of granularity.
    pub fn checkpoint(&self) -> ServiceResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ServiceError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Like [`checkpoint`](Self::checkpoint), but only under mid-flight
    /// granularity. Used inside compute loops.
    pub fn poll_abort(&self) -> ServiceResult<()> {
        match self.granularity {
            CancellationGranularity::Steps => Ok(()),
            CancellationGranularity::MidFlight => self.checkpoint(),
        }
    }

    /// Run `fut`, racing it against cancellation and the deadline when the
    /// granularity is mid-flight.
    pub async fn guard<F, T>(&self, fut: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        if self.granularity == CancellationGranularity::Steps {
            return fut.await;
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            result = fut => result,
            _ = self.cancellation.cancelled() => Err(ServiceError::Cancelled),
            _ = deadline => Err(ServiceError::DeadlineExceeded),
        }
    }

    /// Sleep for `duration`, honouring the granularity policy.
    pub async fn sleep(&self, duration: Duration) -> ServiceResult<()> {
        if duration.is_zero() {
            return Ok(());
        }
        self.guard(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
