//! Read-only lookups over the order/client/company collections.
//!
//! Thin find wrappers; the interesting part is that every owner lookup
//! fans out across all known identifier fields, because upstream data
//! references the same owner under different keys.

use std::collections::HashSet;

use service_core::error::AppError;

use crate::models::IDENTITY_FIELDS;
use crate::services::store::{
    filter_eq, with_eq, Filter, Record, RecordStore, CLIENTS, COMPANIES, INVOICES, ORDERS,
};

/// Order fields that may reference the owning client.
const ORDER_CLIENT_FIELDS: &[&str] = &["client_id", "client_email"];

pub async fn all_orders<S: RecordStore>(store: &S) -> Result<Vec<Record>, AppError> {
    store.find(ORDERS, Filter::new()).await
}

pub async fn all_clients<S: RecordStore>(store: &S) -> Result<Vec<Record>, AppError> {
    store.find(CLIENTS, Filter::new()).await
}

pub async fn all_companies<S: RecordStore>(store: &S) -> Result<Vec<Record>, AppError> {
    store.find(COMPANIES, Filter::new()).await
}

/// Orders referencing any of the given client identifier values.
pub async fn orders_for_client<S: RecordStore>(
    store: &S,
    identities: &[String],
) -> Result<Vec<Record>, AppError> {
    let mut orders = Vec::new();
    let mut seen = HashSet::new();
    for identity in identities {
        for field in ORDER_CLIENT_FIELDS {
            let found = store.find(ORDERS, filter_eq(field, identity.as_str())).await?;
            merge_unique(&mut orders, &mut seen, found);
        }
    }
    Ok(orders)
}

/// Orders referencing any of the given company identifier values.
pub async fn orders_for_company<S: RecordStore>(
    store: &S,
    identities: &[String],
) -> Result<Vec<Record>, AppError> {
    let mut orders = Vec::new();
    let mut seen = HashSet::new();
    for identity in identities {
        let found = store
            .find(ORDERS, filter_eq("company_id", identity.as_str()))
            .await?;
        merge_unique(&mut orders, &mut seen, found);
    }
    Ok(orders)
}

/// Find a client record by any identifier field.
pub async fn find_client_by_identity<S: RecordStore>(
    store: &S,
    identity: &str,
) -> Result<Option<Record>, AppError> {
    find_by_identity(store, CLIENTS, identity).await
}

/// Find a company record by any identifier field.
pub async fn find_company_by_identity<S: RecordStore>(
    store: &S,
    identity: &str,
) -> Result<Option<Record>, AppError> {
    find_by_identity(store, COMPANIES, identity).await
}

async fn find_by_identity<S: RecordStore>(
    store: &S,
    collection: &str,
    identity: &str,
) -> Result<Option<Record>, AppError> {
    for field in IDENTITY_FIELDS {
        let mut found = store.find(collection, filter_eq(field, identity)).await?;
        if let Some(record) = found.drain(..).next() {
            return Ok(Some(record));
        };
    }
    Ok(None)
}

/// Invoices of one type whose owner snapshot carries any of the given
/// identifier values under any identity field.
pub async fn invoices_for_owner<S: RecordStore>(
    store: &S,
    invoice_type: &str,
    owner_key: &str,
    identities: &[String],
) -> Result<Vec<Record>, AppError> {
    let mut invoices = Vec::new();
    let mut seen = HashSet::new();
    for identity in identities {
        for field in IDENTITY_FIELDS {
            let filter = with_eq(
                filter_eq("invoice_type", invoice_type),
                &format!("{}.{}", owner_key, field),
                identity.as_str(),
            );
            let found = store.find(INVOICES, filter).await?;
            merge_unique(&mut invoices, &mut seen, found);
        }
    }
    Ok(invoices)
}

fn merge_unique(into: &mut Vec<Record>, seen: &mut HashSet<String>, found: Vec<Record>) {
    for record in found {
        if seen.insert(record.id.clone()) {
            into.push(record);
        }
    }
}
