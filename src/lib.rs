//! Microservice emulator node library.

pub mod cli;
pub mod config;
pub mod context;
pub mod downstream;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod service;
pub mod storage;
pub mod workload;

#[cfg(test)]
pub(crate) mod testing;

pub use config::NodeConfig;
pub use context::ExecutionContext;
pub use error::{ServiceError, ServiceResult};
pub use http::NodeServer;
pub use lifecycle::Shutdown;
pub use service::Service;
