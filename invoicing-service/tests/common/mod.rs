//! Shared fixtures for the invoicing job tests. Everything runs against
//! the in-memory store, seeded per test.

#![allow(dead_code)]

use std::sync::Once;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::BoxFuture;
use invoicing_service::services::store::{Filter, Record, RecordStore, CLIENTS, COMPANIES, ORDERS};
use invoicing_service::services::MemoryStore;
use serde_json::{json, Value};
use service_core::error::AppError;

static TRACING: Once = Once::new();

/// Fresh store with tracing initialized once per binary.
pub fn store() -> MemoryStore {
    TRACING.call_once(|| {
        if std::env::var("TEST_LOG").is_ok() {
            service_core::observability::init_tracing("invoicing-service-tests", "debug");
        }
    });
    MemoryStore::new()
}

pub async fn seed(store: &MemoryStore, collection: &str, document: Value) -> Record {
    store
        .insert(collection, document)
        .await
        .expect("Failed to seed record")
}

pub async fn seed_client(store: &MemoryStore, uid: &str, email: &str) -> Record {
    seed(
        store,
        CLIENTS,
        json!({
            "uid": uid,
            "email": email,
            "name": "Test Client",
            "refid": "REF-77",
        }),
    )
    .await
}

pub async fn seed_company(store: &MemoryStore, uid: &str, email: &str) -> Record {
    seed(
        store,
        COMPANIES,
        json!({
            "uid": uid,
            "email": email,
            "name": "Test Fleet Co",
        }),
    )
    .await
}

/// A delivered fuel order owned by a client.
pub async fn seed_client_order(
    store: &MemoryStore,
    client_id: &str,
    total: f64,
    delivered_at: &str,
) -> Record {
    seed(
        store,
        ORDERS,
        json!({
            "client_id": client_id,
            "product_name": "Diesel",
            "quantity": 10,
            "total_price": total,
            "delivered_at": delivered_at,
        }),
    )
    .await
}

/// A delivered fuel order owned by a company.
pub async fn seed_company_order(
    store: &MemoryStore,
    company_id: &str,
    product: &str,
    quantity: f64,
    total: f64,
    delivered_at: &str,
) -> Record {
    seed(
        store,
        ORDERS,
        json!({
            "company_id": company_id,
            "product_name": product,
            "quantity": quantity,
            "total_price": total,
            "delivered_at": delivered_at,
        }),
    )
    .await
}

/// All records currently in a collection.
pub async fn dump(store: &MemoryStore, collection: &str) -> Vec<Record> {
    store
        .find(collection, Default::default())
        .await
        .expect("Failed to list records")
}

/// Walk a persisted document and fail on any `null` left in it.
pub fn assert_no_nulls(value: &Value) {
    match value {
        Value::Null => panic!("found a null value in a persisted document"),
        Value::Object(map) => map.values().for_each(assert_no_nulls),
        Value::Array(items) => items.iter().for_each(assert_no_nulls),
        _ => {}
    }
}

/// Store wrapper that fails targeted operations, for exercising the
/// per-entity error isolation of the batch jobs. Reads and everything
/// not targeted pass through to the shared in-memory store.
#[derive(Clone)]
pub struct FailingStore {
    inner: MemoryStore,
    deny_insert_order_id: Option<String>,
    deny_delete_id: Option<String>,
}

impl FailingStore {
    pub fn wrap(inner: MemoryStore) -> Self {
        Self {
            inner,
            deny_insert_order_id: None,
            deny_delete_id: None,
        }
    }

    /// Fail any insert whose `order_id` field matches.
    pub fn failing_insert_for_order(mut self, order_id: &str) -> Self {
        self.deny_insert_order_id = Some(order_id.to_string());
        self
    }

    /// Fail deletion of one specific record id.
    pub fn failing_delete_of(mut self, id: &str) -> Self {
        self.deny_delete_id = Some(id.to_string());
        self
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn find(&self, collection: &str, filter: Filter) -> Result<Vec<Record>, AppError> {
        self.inner.find(collection, filter).await
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Record, AppError> {
        if let Some(denied) = &self.deny_insert_order_id {
            if record.get("order_id").and_then(Value::as_str) == Some(denied.as_str()) {
                return Err(AppError::DatabaseError(anyhow!("simulated write failure")));
            }
        }
        self.inner.insert(collection, record).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        if self.deny_delete_id.as_deref() == Some(id) {
            return Err(AppError::DatabaseError(anyhow!("simulated delete failure")));
        }
        self.inner.delete(collection, id).await
    }

    async fn transaction<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(Self) -> BoxFuture<'static, Result<T, AppError>> + Send + 'static,
    {
        f(self.clone()).await
    }
}
