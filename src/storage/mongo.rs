//! MongoDB document store.

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection};

use super::{DocumentStore, StoreError};
use crate::config::StorageConfig;

/// A MongoDB collection of `{id, value}` documents.
#[derive(Debug, Clone)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect using the configured URI. The driver connects lazily, so an
    /// unreachable server surfaces on the first operation.
    pub async fn connect(config: &StorageConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.uri).await?;
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);
        tracing::info!(
            database = %config.database,
            collection = %config.collection,
            "MongoDB collection ready"
        );
        Ok(Self { collection })
    }
}

/// Numeric `value` field of a document.
fn numeric_value(document: &Document) -> Option<f64> {
    match document.get("value")? {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

/// Printable form of an inserted id.
fn format_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_value(&self, id: i64) -> Result<Option<f64>, StoreError> {
        match self.collection.find_one(doc! { "id": id }).await? {
            Some(document) => numeric_value(&document)
                .map(Some)
                .ok_or(StoreError::Malformed { id }),
            None => Ok(None),
        }
    }

    async fn insert_sample(&self, app: &str, rand_value: f64) -> Result<String, StoreError> {
        let result = self
            .collection
            .insert_one(doc! { "app": app, "rand_value": rand_value })
            .await?;
        Ok(format_id(&result.inserted_id))
    }
}
