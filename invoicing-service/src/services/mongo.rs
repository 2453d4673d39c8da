//! MongoDB-backed record store.

use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Collection, Database, IndexModel};
use serde_json::Value;
use service_core::error::AppError;

use crate::services::metrics::STORE_OP_DURATION;
use crate::services::store::{compact, Filter, Record, RecordStore, INVOICES};

/// Transient-failure cutoff per store call.
const STORE_OP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to MongoDB");
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Connected to MongoDB database");
        Ok(Self { client, db })
    }

    /// Create the indexes the jobs rely on. The unique index on
    /// `invoice_number` enforces number uniqueness at the store layer,
    /// closing the allocator's check-then-insert window.
    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        let invoices = self.collection(INVOICES);

        let invoice_number_index = IndexModel::builder()
            .keys(doc! { "invoice_number": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_number_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        invoices
            .create_index(invoice_number_index, None)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create invoice_number index");
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on invoices.invoice_number");

        let type_month_index = IndexModel::builder()
            .keys(doc! { "invoice_type": 1, "month_name": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_type_month_lookup".to_string())
                    .build(),
            )
            .build();
        invoices
            .create_index(type_month_index, None)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create invoice_type/month_name index");
                AppError::from(e)
            })?;
        tracing::info!("Created index on invoices.(invoice_type, month_name)");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "MongoDB health check failed");
                AppError::from(e)
            })?;
        Ok(())
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    async fn timed<T, F>(op: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, mongodb::error::Error>>,
    {
        let timer = STORE_OP_DURATION.with_label_values(&[op]).start_timer();
        let result = tokio::time::timeout(STORE_OP_TIMEOUT, fut).await;
        timer.observe_duration();
        match result {
            Ok(inner) => inner.map_err(AppError::from),
            Err(_) => Err(AppError::DatabaseError(anyhow!(
                "store operation '{}' timed out after {}s",
                op,
                STORE_OP_TIMEOUT.as_secs()
            ))),
        }
    }

    fn record_from_document(mut doc: Document) -> Result<Record, AppError> {
        let id = match doc.remove("_id") {
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let value = serde_json::to_value(&doc)
            .map_err(|e| AppError::DatabaseError(anyhow!("unreadable document: {}", e)))?;
        let Value::Object(fields) = value else {
            return Err(AppError::DatabaseError(anyhow!(
                "document did not deserialize to a map"
            )));
        };
        Ok(Record { id, fields })
    }
}

#[async_trait]
impl RecordStore for MongoStore {
    async fn find(&self, collection: &str, filter: Filter) -> Result<Vec<Record>, AppError> {
        let filter = mongodb::bson::to_document(&Value::Object(filter))
            .map_err(|e| AppError::BadRequest(anyhow!("invalid filter: {}", e)))?;
        let target = self.collection(collection);
        let documents: Vec<Document> = Self::timed("find", async move {
            let cursor = target.find(filter, None).await?;
            cursor.try_collect().await
        })
        .await?;
        documents
            .into_iter()
            .map(Self::record_from_document)
            .collect()
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Record, AppError> {
        let Value::Object(fields) = compact(record) else {
            return Err(AppError::BadRequest(anyhow!(
                "record must be a document, not a scalar"
            )));
        };
        let document = mongodb::bson::to_document(&Value::Object(fields.clone()))
            .map_err(|e| AppError::BadRequest(anyhow!("unencodable record: {}", e)))?;
        let target = self.collection(collection);
        let result =
            Self::timed("insert", async move { target.insert_one(document, None).await }).await?;
        let id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };
        Ok(Record { id, fields })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let oid = ObjectId::parse_str(id)
            .map_err(|e| AppError::BadRequest(anyhow!("invalid record id '{}': {}", id, e)))?;
        let target = self.collection(collection);
        Self::timed("delete", async move {
            target.delete_one(doc! { "_id": oid }, None).await
        })
        .await?;
        Ok(())
    }

    // The closure runs without session isolation; the unique index on
    // invoice_number is what enforces allocation atomicity here.
    async fn transaction<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(Self) -> BoxFuture<'static, Result<T, AppError>> + Send + 'static,
    {
        f(self.clone()).await
    }
}
