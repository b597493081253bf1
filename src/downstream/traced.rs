//! Client span around a downstream call.

use std::borrow::Cow;

use async_trait::async_trait;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::SdkTracer;

use crate::context::ExecutionContext;
use crate::downstream::Downstream;
use crate::error::ServiceResult;

/// Opens a child span of the current context for each call to `inner`.
///
/// The inner call sees a context whose current span is the new one, so the
/// peer's request span becomes its child.
pub struct TracedDownstream<D> {
    inner: D,
    tracer: SdkTracer,
    span_name: Cow<'static, str>,
}

impl<D: Downstream> TracedDownstream<D> {
    pub fn new(inner: D, tracer: SdkTracer, span_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            inner,
            tracer,
            span_name: span_name.into(),
        }
    }
}

/// Ends the call span exactly once. A call dropped mid-flight, such as one
/// aborted by the request deadline, ends with an error status.
struct CallSpanGuard {
    cx: Context,
    finished: bool,
}

impl CallSpanGuard {
    fn finish(mut self, result: &ServiceResult<()>) {
        if let Err(err) = result {
            self.cx.span().set_status(Status::error(err.to_string()));
        }
        self.finished = true;
    }
}

impl Drop for CallSpanGuard {
    fn drop(&mut self) {
        let span = self.cx.span();
        if !self.finished {
            span.set_status(Status::error("call dropped before completion"));
        }
        span.end();
    }
}

#[async_trait]
impl<D: Downstream> Downstream for TracedDownstream<D> {
    fn address(&self) -> &str {
        self.inner.address()
    }

    async fn call(&self, ctx: &ExecutionContext) -> ServiceResult<()> {
        let parent = ctx.trace();
        let span = self
            .tracer
            .span_builder(self.span_name.clone())
            .with_kind(SpanKind::Client)
            .with_attributes([KeyValue::new("peer.address", self.inner.address().to_string())])
            .start_with_context(&self.tracer, parent);
        let guard = CallSpanGuard {
            cx: parent.with_span(span),
            finished: false,
        };

        let result = self.inner.call(&ctx.with_trace(guard.cx.clone())).await;
        guard.finish(&result);
        result
    }
}
