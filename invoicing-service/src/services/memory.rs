//! In-memory record store used by tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use service_core::error::AppError;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::services::store::{compact, Filter, Record, RecordStore};

/// Mutex-guarded document collections. Clones share state, so a clone
/// handed to a transaction closure sees the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Vec<Record>>>>,
    // Held for the duration of a transaction closure so that
    // check-then-insert sequences are serialized in-process.
    txn_lock: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(record: &Record, filter: &Filter) -> bool {
        filter
            .iter()
            .all(|(path, expected)| record.lookup(path) == Some(expected))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, collection: &str, filter: Filter) -> Result<Vec<Record>, AppError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| Self::matches(r, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Record, AppError> {
        let Value::Object(fields) = compact(record) else {
            return Err(AppError::BadRequest(anyhow!(
                "record must be a document, not a scalar"
            )));
        };
        let record = Record {
            id: Uuid::new_v4().to_string(),
            fields,
        };
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let mut collections = self.collections.lock().await;
        if let Some(records) = collections.get_mut(collection) {
            records.retain(|r| r.id != id);
        }
        Ok(())
    }

    async fn transaction<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(Self) -> BoxFuture<'static, Result<T, AppError>> + Send + 'static,
    {
        let _guard = self.txn_lock.lock().await;
        f(self.clone()).await
    }
}
