//! Request span decorator.

use std::borrow::Cow;

use async_trait::async_trait;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracer;
use tower::Layer;

use crate::context::ExecutionContext;
use crate::error::ServiceResult;
use crate::http::propagation::HeaderExtractor;
use crate::service::Service;

/// Wraps a service in a [`TracingService`].
#[derive(Debug, Clone)]
pub struct TracingLayer {
    tracer: SdkTracer,
    span_name: Cow<'static, str>,
    propagator: TraceContextPropagator,
}

impl TracingLayer {
    pub fn new(tracer: SdkTracer, span_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tracer,
            span_name: span_name.into(),
            propagator: TraceContextPropagator::new(),
        }
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            tracer: self.tracer.clone(),
            span_name: self.span_name.clone(),
            propagator: self.propagator.clone(),
        }
    }
}

/// Opens one server span per request around the inner service.
///
/// The parent is the trace context carried by the inbound request headers,
/// else the context's current span, else none (a new trace).
pub struct TracingService<S> {
    inner: S,
    tracer: SdkTracer,
    span_name: Cow<'static, str>,
    propagator: TraceContextPropagator,
}

impl<S> TracingService<S> {
    fn parent_context(&self, ctx: &ExecutionContext) -> Context {
        match ctx.inbound_headers() {
            Some(headers) => self
                .propagator
                .extract_with_context(ctx.trace(), &HeaderExtractor(headers)),
            None => ctx.trace().clone(),
        }
    }
}

/// Ends the request span exactly once, including when the request future is
/// dropped before completion.
struct SpanGuard {
    cx: Context,
    finished: bool,
}

impl SpanGuard {
    fn finish(mut self, result: &ServiceResult<String>) {
        if let Err(err) = result {
            self.cx.span().set_status(Status::error(err.to_string()));
        }
        self.finished = true;
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        let span = self.cx.span();
        if !self.finished {
            span.set_status(Status::error("request dropped before completion"));
        }
        span.end();
    }
}

#[async_trait]
impl<S: Service> Service for TracingService<S> {
    async fn execute(&self, ctx: &ExecutionContext) -> ServiceResult<String> {
        let parent = self.parent_context(ctx);
        let span = self
            .tracer
            .span_builder(self.span_name.clone())
            .with_kind(SpanKind::Server)
            .start_with_context(&self.tracer, &parent);
        let cx = parent.with_span(span);
        let guard = SpanGuard {
            cx: cx.clone(),
            finished: false,
        };

        let result = self.inner.execute(&ctx.with_trace(cx)).await;

        guard.finish(&result);
        result
    }

    fn layers(&self) -> Vec<&'static str> {
        let mut layers = vec!["tracing"];
        layers.extend(self.inner.layers());
        layers
    }
}
