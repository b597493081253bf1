//! Service capability subsystem.
//!
//! # Data Flow
//! ```text
//! transport (http::server)
//!     → Tracing → Instrumenting → Logging   (middleware, outer to inner)
//!     → base.rs (workload simulator, then downstream fan-out)
//!       or storage::StorageService (document store leaf)
//! ```
//!
//! # Design Decisions
//! - Every variant shares the exact `execute` contract, so decorators nest
//! - Decorators own their inner service and call it explicitly
//! - The fully nested chain is built once at startup and shared via `Arc`

pub mod base;

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::ServiceResult;

pub use base::BaseService;

/// "Do the simulated work and report the outcome."
#[async_trait]
pub trait Service: Send + Sync {
    /// Execute one request, returning the response payload.
    async fn execute(&self, ctx: &ExecutionContext) -> ServiceResult<String>;

    /// Names of the layers in this chain, outermost first.
    fn layers(&self) -> Vec<&'static str>;
}

#[async_trait]
impl<S: Service + ?Sized> Service for Arc<S> {
    async fn execute(&self, ctx: &ExecutionContext) -> ServiceResult<String> {
        (**self).execute(ctx).await
    }

    fn layers(&self) -> Vec<&'static str> {
        (**self).layers()
    }
}

#[async_trait]
impl<S: Service + ?Sized> Service for Box<S> {
    async fn execute(&self, ctx: &ExecutionContext) -> ServiceResult<String> {
        (**self).execute(ctx).await
    }

    fn layers(&self) -> Vec<&'static str> {
        (**self).layers()
    }
}
