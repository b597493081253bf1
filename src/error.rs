//! Errors surfaced by the request-execution pipeline.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that can occur while executing a request.
///
/// Every variant is propagated unchanged through the middleware chain, so the
/// payloads are plain strings and the type stays comparable in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// A downstream call could not be completed (connect, send, read).
    #[error("downstream call to {address} failed: {message}")]
    Downstream { address: String, message: String },

    /// A downstream peer answered with a non-success status.
    #[error("downstream call to {address} returned status {status}")]
    DownstreamStatus { address: String, status: u16 },

    /// The per-request deadline elapsed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The workload simulator failed (e.g. the CPU worker panicked).
    #[error("workload simulation failed: {0}")]
    Workload(String),

    /// The document store rejected an operation.
    #[error("storage operation failed: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Status code the transport answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Downstream { .. } | ServiceError::DownstreamStatus { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ServiceError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Workload(_) | ServiceError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result type for pipeline operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServiceError::DownstreamStatus {
            address: "http://b:8080/".into(),
            status: 500,
        };
        assert_eq!(
            err.to_string(),
            "downstream call to http://b:8080/ returned status 500"
        );
        assert_eq!(ServiceError::DeadlineExceeded.to_string(), "request deadline exceeded");
    }

    #[test]
    fn test_status_mapping() {
        let err = ServiceError::Downstream {
            address: "http://b".into(),
            message: "connection refused".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ServiceError::DeadlineExceeded.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ServiceError::Storage("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
