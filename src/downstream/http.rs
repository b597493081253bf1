//! HTTP downstream peer.

use async_trait::async_trait;
use axum::http::HeaderMap;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use url::Url;

use crate::context::ExecutionContext;
use crate::downstream::Downstream;
use crate::error::{ServiceError, ServiceResult};
use crate::http::propagation::HeaderInjector;
use crate::http::request::ExecuteRequest;

/// A peer node reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDownstream {
    address: String,
    url: Url,
    client: reqwest::Client,
    propagator: TraceContextPropagator,
}

impl HttpDownstream {
    pub fn new(address: &str, client: reqwest::Client) -> Result<Self, url::ParseError> {
        let url = Url::parse(address)?;
        Ok(Self {
            address: address.to_string(),
            url,
            client,
            propagator: TraceContextPropagator::new(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ServiceError {
        ServiceError::Downstream {
            address: self.address.clone(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl Downstream for HttpDownstream {
    fn address(&self) -> &str {
        &self.address
    }

    async fn call(&self, ctx: &ExecutionContext) -> ServiceResult<()> {
        let mut headers = HeaderMap::new();
        self.propagator
            .inject_context(ctx.trace(), &mut HeaderInjector(&mut headers));

        let response = self
            .client
            .get(self.url.clone())
            .headers(headers)
            .json(&ExecuteRequest::default())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        // The peer's payload is not interpreted, only drained.
        response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(ServiceError::DownstreamStatus {
                address: self.address.clone(),
                status: status.as_u16(),
            });
        }

        tracing::debug!(downstream = %self.address, status = %status, "Downstream call succeeded");
        Ok(())
    }
}
