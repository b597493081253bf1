//! Request encoding.
//!
//! # Responsibilities
//! - Define the JSON body sent to downstream peers
//! - Request IDs are assigned by the tower-http layer in `server.rs`
//!
//! # Design Decisions
//! - Inbound bodies are never interpreted; decoding yields nothing
//! - Outbound bodies carry the same `{"payload": ...}` object the node answers with

use serde::{Deserialize, Serialize};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Body of an outbound call. Empty payload for this domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub payload: String,
}
