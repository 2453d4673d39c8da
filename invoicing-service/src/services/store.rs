//! Record store gateway.
//!
//! The invoice store is an external collaborator: a document collection
//! keyed by generated ids, reached through a generic find/insert/delete/
//! transaction capability. Everything in this crate is written against
//! the [`RecordStore`] trait; `MongoStore` backs production and
//! `MemoryStore` backs the test suite.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use service_core::error::AppError;

use crate::models::{identity_values, lookup, value_as_string, Fields};

pub const INVOICES: &str = "invoices";
pub const ORDERS: &str = "orders";
pub const CLIENTS: &str = "clients";
pub const COMPANIES: &str = "companies";

/// Equality filter over dotted field paths.
pub type Filter = Map<String, Value>;

/// A stored document together with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Fields,
}

impl Record {
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup(&self.fields, path)
    }

    /// Every identifier value on this record, including the store id.
    pub fn identity_values(&self) -> Vec<String> {
        let mut values = identity_values(&self.fields);
        if !self.id.is_empty() && !values.contains(&self.id) {
            values.push(self.id.clone());
        }
        values
    }

    /// Shallow copy of the document body with a usable `id` field
    /// force-stamped in: the existing field wins, then the store id,
    /// then a legacy `order_id` field.
    pub fn snapshot(&self) -> Fields {
        let mut fields = self.fields.clone();
        let has_id = fields.get("id").and_then(value_as_string).is_some();
        if !has_id {
            let id = if !self.id.is_empty() {
                Some(self.id.clone())
            } else {
                fields.get("order_id").and_then(value_as_string)
            };
            if let Some(id) = id {
                fields.insert("id".to_string(), Value::String(id));
            }
        }
        fields
    }
}

/// Build a single-condition equality filter.
pub fn filter_eq(path: &str, value: impl Into<Value>) -> Filter {
    let mut filter = Filter::new();
    filter.insert(path.to_string(), value.into());
    filter
}

/// Add a condition to an existing filter.
pub fn with_eq(mut filter: Filter, path: &str, value: impl Into<Value>) -> Filter {
    filter.insert(path.to_string(), value.into());
    filter
}

/// Strip null fields from a document, recursively. The store rejects
/// null values, so every implementation applies this before a write.
pub fn compact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, compact(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(compact).collect()),
        other => other,
    }
}

/// Generic document store capability. Stores are cheap handles
/// (`Clone` shares the underlying connection/state).
#[async_trait]
pub trait RecordStore: Clone + Send + Sync {
    /// All records in `collection` matching every filter condition.
    async fn find(&self, collection: &str, filter: Filter) -> Result<Vec<Record>, AppError>;

    /// Persist a document (nulls stripped) and return it with its
    /// store-assigned id.
    async fn insert(&self, collection: &str, record: Value) -> Result<Record, AppError>;

    /// Remove a record by id. Removing an absent id is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;

    /// Run `f` as an atomic unit where the backend supports it. The
    /// closure receives a handle with the same read/write capability.
    async fn transaction<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(Self) -> BoxFuture<'static, Result<T, AppError>> + Send + 'static,
        Self: Sized;
}
