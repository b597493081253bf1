//! Request metrics decorator.

use async_trait::async_trait;
use tokio::time::Instant;
use tower::Layer;

use crate::context::ExecutionContext;
use crate::error::ServiceResult;
use crate::observability::ServiceMetrics;
use crate::service::Service;

/// Wraps a service in an [`InstrumentingService`].
#[derive(Clone)]
pub struct InstrumentingLayer {
    metrics: ServiceMetrics,
}

impl InstrumentingLayer {
    pub fn new(metrics: ServiceMetrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for InstrumentingLayer {
    type Service = InstrumentingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentingService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

/// Records request count and latency for every execution, whatever its
/// outcome.
pub struct InstrumentingService<S> {
    inner: S,
    metrics: ServiceMetrics,
}

/// Records the request on drop.
struct RequestTimer<'a> {
    metrics: &'a ServiceMetrics,
    start: Instant,
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.metrics.record_request(self.start.elapsed());
    }
}

#[async_trait]
impl<S: Service> Service for InstrumentingService<S> {
    async fn execute(&self, ctx: &ExecutionContext) -> ServiceResult<String> {
        let _timer = RequestTimer {
            metrics: &self.metrics,
            start: Instant::now(),
        };
        self.inner.execute(ctx).await
    }

    fn layers(&self) -> Vec<&'static str> {
        let mut layers = vec!["instrumenting"];
        layers.extend(self.inner.layers());
        layers
    }
}
