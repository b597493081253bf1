//! Storage-backed service variant.
//!
//! # Data Flow
//! ```text
//! StorageService::execute
//!     → read_ops × DocumentStore::find_value (random id in 0..items_count)
//!     → write_ops × DocumentStore::insert_sample ({app, rand_value})
//!     → payload = result of the last operation
//! ```
//!
//! # Design Decisions
//! - A missing id is not an error: the request answers `"id not found"`
//!   and skips the remaining operations
//! - Every store operation has its own timeout
//! - Store failures propagate as `ServiceError::Storage`

pub mod memory;
pub mod mongo;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::{StorageConfig, StoreBackend};
use crate::context::ExecutionContext;
use crate::error::{ServiceError, ServiceResult};
use crate::service::Service;

pub use self::memory::InMemoryStore;
pub use self::mongo::MongoStore;

/// Payload returned when a looked-up id does not exist.
pub const NOT_FOUND_PAYLOAD: &str = "id not found";

/// `app` field of every inserted document.
pub const SAMPLE_APP: &str = "vecro-sim";

/// Errors reported by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("document {id} has no numeric 'value' field")]
    Malformed { id: i64 },
}

/// A collection of `{id, value}` documents that also accepts samples.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `value` of the document with this `id`, `None` when absent.
    async fn find_value(&self, id: i64) -> Result<Option<f64>, StoreError>;

    /// Insert `{app, rand_value}` and return the new document's id.
    async fn insert_sample(&self, app: &str, rand_value: f64) -> Result<String, StoreError>;
}

/// Open the configured backend.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        StoreBackend::Mongodb => {
            let store = MongoStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(InMemoryStore::populated(config.items_count))),
    }
}

/// Service that performs document store operations per request.
pub struct StorageService {
    store: Arc<dyn DocumentStore>,
    read_ops: u64,
    write_ops: u64,
    items_count: u64,
    op_timeout: Duration,
    rng: Mutex<StdRng>,
}

impl StorageService {
    pub fn new(store: Arc<dyn DocumentStore>, config: &StorageConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            read_ops: config.read_ops,
            write_ops: config.write_ops,
            items_count: config.items_count.max(1),
            op_timeout: Duration::from_secs(config.op_timeout_secs),
            rng: Mutex::new(rng),
        }
    }

    fn random_id(&self) -> i64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(0..self.items_count) as i64
    }

    fn random_value(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen()
    }

    /// Run one store operation under the per-op timeout and the request's
    /// cancellation policy.
    async fn bounded<T, F>(&self, ctx: &ExecutionContext, op: &'static str, fut: F) -> ServiceResult<T>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        ctx.checkpoint()?;
        let timeout = self.op_timeout;
        ctx.guard(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result.map_err(|e| ServiceError::Storage(e.to_string())),
                Err(_) => Err(ServiceError::Storage(
                    StoreError::Timeout { op, timeout }.to_string(),
                )),
            }
        })
        .await
    }
}

#[async_trait]
impl Service for StorageService {
    async fn execute(&self, ctx: &ExecutionContext) -> ServiceResult<String> {
        let mut last = String::new();

        for _ in 0..self.read_ops {
            let id = self.random_id();
            tracing::debug!(id, "Reading document");
            match self.bounded(ctx, "find", self.store.find_value(id)).await? {
                Some(value) => last = format!("{:.6}", value),
                None => {
                    tracing::debug!(id, "Document not found");
                    return Ok(NOT_FOUND_PAYLOAD.to_string());
                }
            }
        }

        for _ in 0..self.write_ops {
            let rand_value = self.random_value();
            last = self
                .bounded(ctx, "insert", self.store.insert_sample(SAMPLE_APP, rand_value))
                .await?;
            tracing::debug!(inserted_id = %last, "Inserted document");
        }

        Ok(last)
    }

    fn layers(&self) -> Vec<&'static str> {
        vec!["storage"]
    }
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("read_ops", &self.read_ops)
            .field("write_ops", &self.write_ops)
            .field("items_count", &self.items_count)
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}
