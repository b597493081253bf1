//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, access span)
//!     → ExecutionContext::from_headers (inbound trace carrier, deadline)
//!     → decorated service chain
//!     → response.rs (encode payload or error, count bytes)
//!     → Send to client
//!
//! Outbound (downstream calls):
//!     → propagation.rs (inject traceparent/tracestate)
//!     → request.rs (`{"payload": ""}` body)
//! ```

pub mod propagation;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ExecuteRequest, X_REQUEST_ID};
pub use response::{EncodedResponse, ErrorResponse, ExecuteResponse};
pub use server::{AppState, NodeServer};
