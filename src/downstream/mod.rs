//! Downstream call fan-out.
//!
//! # Data Flow
//! ```text
//! BaseService
//!     → FanOut::call_all (in configured order, one at a time)
//!         → traced.rs (child span "downstream-call")
//!         → http.rs (inject traceparent, GET peer, drain body)
//! ```
//!
//! # Design Decisions
//! - Strictly sequential: a request's downstream latency is the sum of its calls
//! - Fail-fast: the first error stops iteration and is returned unchanged
//! - No retries, no backoff, no circuit breaking

pub mod http;
pub mod traced;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opentelemetry_sdk::trace::SdkTracer;
use thiserror::Error;

use crate::config::CallsConfig;
use crate::context::ExecutionContext;
use crate::error::ServiceResult;

pub use self::http::HttpDownstream;
pub use self::traced::TracedDownstream;

/// Name of the span opened around each downstream call.
pub const DOWNSTREAM_SPAN_NAME: &str = "downstream-call";

/// A remote peer invoked during fan-out.
#[async_trait]
pub trait Downstream: Send + Sync {
    /// Address the peer was configured with.
    fn address(&self) -> &str;

    /// Invoke the peer once. Only success or failure is reported.
    async fn call(&self, ctx: &ExecutionContext) -> ServiceResult<()>;
}

/// Errors building the downstream list at startup.
#[derive(Debug, Error)]
pub enum DownstreamConfigError {
    #[error("invalid downstream address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Ordered, immutable list of downstream references.
#[derive(Clone, Default)]
pub struct FanOut {
    calls: Vec<Arc<dyn Downstream>>,
}

impl FanOut {
    pub fn new(calls: Vec<Arc<dyn Downstream>>) -> Self {
        Self { calls }
    }

    /// Build traced HTTP downstreams from configuration.
    pub fn from_config(
        config: &CallsConfig,
        tracer: &SdkTracer,
    ) -> Result<Self, DownstreamConfigError> {
        let mut builder = reqwest::Client::builder();
        if config.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.timeout_ms));
        }
        let client = builder.build()?;

        let mut calls: Vec<Arc<dyn Downstream>> = Vec::with_capacity(config.addresses.len());
        for address in &config.addresses {
            let downstream = HttpDownstream::new(address, client.clone()).map_err(|source| {
                DownstreamConfigError::Address {
                    address: address.clone(),
                    source,
                }
            })?;
            calls.push(Arc::new(TracedDownstream::new(
                downstream,
                tracer.clone(),
                DOWNSTREAM_SPAN_NAME,
            )));
        }

        Ok(Self { calls })
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Configured addresses, in call order.
    pub fn addresses(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.address()).collect()
    }

    /// Invoke every downstream in order, stopping at the first failure.
    pub async fn call_all(&self, ctx: &ExecutionContext) -> ServiceResult<()> {
        for (index, call) in self.calls.iter().enumerate() {
            ctx.checkpoint()?;
            if let Err(err) = ctx.guard(call.call(ctx)).await {
                tracing::warn!(
                    downstream = call.address(),
                    position = index + 1,
                    error = %err,
                    "Downstream call failed"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOut")
            .field("addresses", &self.addresses())
            .finish()
    }
}
