//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: `/metrics` plus a catch-all execute route
//! - Wire up middleware (access tracing, request ID)
//! - Build the execution context of each request from its headers
//! - Encode the outcome and record response throughput
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ExecutionConfig;
use crate::context::ExecutionContext;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::EncodedResponse;
use crate::observability::ServiceMetrics;
use crate::service::Service;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Fully decorated service chain.
    pub service: Arc<dyn Service>,
    pub metrics: ServiceMetrics,
    /// Render handle for `/metrics`; `None` when metrics are disabled.
    pub prometheus: Option<PrometheusHandle>,
    pub execution: ExecutionConfig,
}

/// HTTP front of one emulated microservice.
pub struct NodeServer {
    router: Router,
}

impl NodeServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/", any(execute_handler))
            .route("/{*path}", any(execute_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Execute the pipeline. The request body is never read.
async fn execute_handler(State(state): State<AppState>, headers: HeaderMap) -> EncodedResponse {
    let timeout = match state.execution.timeout_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };
    // axum drops this future when the client goes away; the guard then
    // cancels work still running on other tasks, such as the CPU burn.
    let cancellation = CancellationToken::new();
    let _cancel_on_drop = cancellation.clone().drop_guard();
    let ctx = ExecutionContext::from_headers(headers)
        .with_timeout(timeout)
        .with_granularity(state.execution.granularity)
        .with_cancellation(cancellation);

    let outcome = state.service.execute(&ctx).await;

    let encoded = EncodedResponse::from_outcome(outcome);
    state.metrics.record_throughput(encoded.len());
    encoded
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeIdentity;
    use crate::error::ServiceError;
    use crate::http::response::{ErrorResponse, ExecuteResponse};
    use crate::observability::metrics::prometheus_builder;
    use crate::testing::StaticService;
    use crate::config::CancellationGranularity;
    use crate::error::ServiceResult;
    use crate::workload::simulator::burn_cpu_units;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use std::sync::Mutex;
    use tokio::sync::oneshot;
    use tower::ServiceExt;

    /// Burns CPU on the blocking pool and reports how the burn ended.
    struct CpuBoundService {
        done: Mutex<Option<oneshot::Sender<ServiceResult<()>>>>,
    }

    #[async_trait]
    impl Service for CpuBoundService {
        async fn execute(&self, ctx: &ExecutionContext) -> ServiceResult<String> {
            let done = self.done.lock().unwrap().take();
            let ctx = ctx.clone();
            tokio::task::spawn_blocking(move || {
                let result = burn_cpu_units(10_000_000, &ctx);
                if let Some(done) = done {
                    let _ = done.send(result);
                }
            })
            .await
            .map_err(|e| ServiceError::Workload(e.to_string()))?;
            Ok(String::new())
        }

        fn layers(&self) -> Vec<&'static str> {
            vec!["cpu"]
        }
    }

    fn state(outcome: Result<String, ServiceError>) -> (AppState, PrometheusHandle) {
        state_with(Arc::new(StaticService::new(outcome)))
    }

    fn state_with(service: Arc<dyn Service>) -> (AppState, PrometheusHandle) {
        let recorder = prometheus_builder().unwrap().build_recorder();
        let handle = recorder.handle();
        let node = NodeIdentity {
            name: "social-text".into(),
            subsystem: "social".into(),
        };
        let metrics =
            metrics::with_local_recorder(&recorder, || ServiceMetrics::register("vecro_base", &node));
        // The recorder itself may go: handles keep the registry alive.
        let state = AppState {
            service,
            metrics,
            prometheus: Some(handle.clone()),
            execution: ExecutionConfig::default(),
        };
        (state, handle)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_any_method_any_path_executes() {
        let (state, _) = state(Ok("00000".into()));
        let router = NodeServer::new(state).router();

        for (method, path) in [(Method::GET, "/"), (Method::POST, "/a/b"), (Method::PUT, "/x")] {
            let request = Request::builder()
                .method(method)
                .uri(path)
                .body(Body::from("ignored"))
                .unwrap();
            let response = router.clone().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key(X_REQUEST_ID));
            let body: ExecuteResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
            assert_eq!(body.payload, "00000");
        }
    }

    #[tokio::test]
    async fn test_error_maps_to_status() {
        let (state, _) = state(Err(ServiceError::DownstreamStatus {
            address: "http://b:8080/".into(),
            status: 500,
        }));
        let router = NodeServer::new(state).router();

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(body.error.contains("status 500"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_reports_throughput() {
        let (state, _) = state(Ok("00000".into()));
        let router = NodeServer::new(state).router();

        router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = String::from_utf8(body_bytes(response).await).unwrap();
        let expected = r#"{"payload":"00000"}"#.len();
        assert!(text.contains(&format!(
            "vecro_base_social_throughput{{vecrosim_service_name=\"social-text\"}} {}",
            expected
        )));
    }

    #[tokio::test]
    async fn test_inbound_request_id_is_propagated() {
        let (state, _) = state(Ok(String::new()));
        let router = NodeServer::new(state).router();

        let response = router
            .oneshot(
                Request::get("/")
                    .header(X_REQUEST_ID, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[X_REQUEST_ID], "req-42");
    }

    #[tokio::test]
    async fn test_client_disconnect_stops_cpu_burn() {
        let (tx, rx) = oneshot::channel();
        let service = CpuBoundService {
            done: Mutex::new(Some(tx)),
        };
        let (mut state, _) = state_with(Arc::new(service));
        state.execution.granularity = CancellationGranularity::MidFlight;
        let router = NodeServer::new(state).router();

        let request = router.oneshot(Request::get("/").body(Body::empty()).unwrap());
        let outcome = tokio::time::timeout(Duration::from_millis(20), request).await;
        assert!(outcome.is_err(), "request should still be burning");

        let burn = tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("burn should stop once the request is dropped")
            .unwrap();
        assert_eq!(burn, Err(ServiceError::Cancelled));
    }
}
