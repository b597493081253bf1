//! Request logging decorator.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tower::Layer;

use crate::context::ExecutionContext;
use crate::error::ServiceResult;
use crate::service::Service;

/// Wraps a service in a [`LoggingService`].
#[derive(Debug, Clone)]
pub struct LoggingLayer {
    service_name: Arc<str>,
}

impl LoggingLayer {
    pub fn new(service_name: impl Into<Arc<str>>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService {
            inner,
            service_name: self.service_name.clone(),
        }
    }
}

/// Emits one structured event per execution with its outcome and duration.
pub struct LoggingService<S> {
    inner: S,
    service_name: Arc<str>,
}

/// Emits the request event on drop.
struct RequestLog<'a> {
    service_name: &'a str,
    start: Instant,
    outcome: Option<Result<(), String>>,
}

impl Drop for RequestLog<'_> {
    fn drop(&mut self) {
        let took_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        match self.outcome.take() {
            Some(Ok(())) => {
                tracing::info!(service = self.service_name, took_ms, "request executed")
            }
            Some(Err(error)) => {
                tracing::warn!(service = self.service_name, %error, took_ms, "request executed")
            }
            None => tracing::warn!(
                service = self.service_name,
                error = "request dropped before completion",
                took_ms,
                "request executed"
            ),
        }
    }
}

#[async_trait]
impl<S: Service> Service for LoggingService<S> {
    async fn execute(&self, ctx: &ExecutionContext) -> ServiceResult<String> {
        let mut log = RequestLog {
            service_name: &self.service_name,
            start: Instant::now(),
            outcome: None,
        };

        let result = self.inner.execute(ctx).await;

        log.outcome = Some(result.as_ref().map(|_| ()).map_err(|e| e.to_string()));
        result
    }

    fn layers(&self) -> Vec<&'static str> {
        let mut layers = vec!["logging"];
        layers.extend(self.inner.layers());
        layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::testing::{CapturedLogs, StaticService};

    fn request_lines(logs: &CapturedLogs) -> Vec<String> {
        logs.lines()
            .into_iter()
            .filter(|l| l.contains("request executed"))
            .collect()
    }

    #[tokio::test]
    async fn test_one_info_event_on_success() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let service = LoggingLayer::new("social-text").layer(StaticService::new(Ok("00".into())));

        assert_eq!(service.execute(&ExecutionContext::new()).await, Ok("00".to_string()));

        let lines = request_lines(&logs);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"level\":\"INFO\""));
        assert!(lines[0].contains("took_ms"));
        assert!(lines[0].contains("social-text"));
    }

    #[tokio::test]
    async fn test_one_warn_event_with_error_on_failure() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let err = ServiceError::DownstreamStatus {
            address: "http://b:8080/".into(),
            status: 500,
        };
        let service =
            LoggingLayer::new("social-text").layer(StaticService::new(Err(err.clone())));

        assert_eq!(service.execute(&ExecutionContext::new()).await, Err(err.clone()));

        let lines = request_lines(&logs);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"level\":\"WARN\""));
        assert!(lines[0].contains(&err.to_string()));
    }
}
