//! In-process document store for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;

use super::{DocumentStore, StoreError};

/// Documents kept in memory. Inserted ids are sequential from zero.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<i64, f64>>,
    inserted: Mutex<Vec<(String, f64)>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding a document for every id in `0..items_count`.
    pub fn populated(items_count: u64) -> Self {
        let values = (0..items_count as i64).map(|id| (id, id as f64 / 1000.0)).collect();
        Self {
            values: RwLock::new(values),
            ..Self::default()
        }
    }

    pub fn put(&self, id: i64, value: f64) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, value);
    }

    /// Samples inserted so far, in order.
    pub fn inserted(&self) -> Vec<(String, f64)> {
        self.inserted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_value(&self, id: i64) -> Result<Option<f64>, StoreError> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied())
    }

    async fn insert_sample(&self, app: &str, rand_value: f64) -> Result<String, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inserted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((app.to_string(), rand_value));
        Ok(id.to_string())
    }
}
