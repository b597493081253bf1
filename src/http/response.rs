//! Response encoding.
//!
//! # Responsibilities
//! - Encode the pipeline's payload as `{"payload": ...}`
//! - Map pipeline errors to HTTP status codes
//!
//! # Design Decisions
//! - The encoded body is produced here so the transport can count its bytes
//! - Downstream failures answer 502, deadline 504, cancellation 503

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Successful response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub payload: String,
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An encoded response, ready to be sent.
#[derive(Debug)]
pub struct EncodedResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl EncodedResponse {
    /// Encode the outcome of one pipeline execution.
    pub fn from_outcome(outcome: Result<String, ServiceError>) -> Self {
        let (status, encoded) = match outcome {
            Ok(payload) => (StatusCode::OK, serde_json::to_vec(&ExecuteResponse { payload })),
            Err(err) => (
                err.status_code(),
                serde_json::to_vec(&ErrorResponse {
                    error: err.to_string(),
                }),
            ),
        };

        match encoded {
            Ok(body) => Self { status, body },
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode response");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: Vec::new(),
                }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Size of the encoded body in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl IntoResponse for EncodedResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_success() {
        let encoded = EncodedResponse::from_outcome(Ok("00000".into()));
        assert_eq!(encoded.status(), StatusCode::OK);
        assert_eq!(encoded.len(), r#"{"payload":"00000"}"#.len());
    }

    #[test]
    fn test_encode_error() {
        let encoded = EncodedResponse::from_outcome(Err(ServiceError::DeadlineExceeded));
        assert_eq!(encoded.status(), StatusCode::GATEWAY_TIMEOUT);
        let body: ErrorResponse = serde_json::from_slice(&encoded.body).unwrap();
        assert_eq!(body.error, "request deadline exceeded");
    }
}
