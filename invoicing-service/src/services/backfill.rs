//! Backfill job: walk every stored order and create the invoices that
//! are missing. Designed for repeated runs over dirty data; failures
//! are collected, never fatal.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use service_core::error::AppError;
use tracing::instrument;

use crate::models::{
    order_date, preferred_identifier, value_as_string, BackfillSummary, BillingMonth, Fields,
};
use crate::services::catalog::{all_clients, all_companies, all_orders};
use crate::services::client_invoices::process_orders;
use crate::services::metrics::JOB_ERRORS_TOTAL;
use crate::services::monthly_invoices::generate_company_monthly_invoice;
use crate::services::store::{Record, RecordStore};

/// One company's orders for one calendar month, with whatever company
/// data could be resolved for the group.
struct CompanyBucket {
    identity: String,
    company: Fields,
    orders: Vec<Record>,
}

/// Generate every missing invoice across all stored orders.
///
/// Orders carrying a `company_id` are grouped per company and month and
/// fed to the monthly aggregator; the rest are matched to a client
/// record and fed to the per-order generator. Orders whose owner cannot
/// be resolved become error entries.
#[instrument(skip(store))]
pub async fn run_backfill<S: RecordStore + 'static>(store: &S) -> Result<BackfillSummary, AppError> {
    let orders = all_orders(store).await?;
    let clients = all_clients(store).await?;
    let companies = all_companies(store).await?;
    tracing::info!(
        orders = orders.len(),
        clients = clients.len(),
        companies = companies.len(),
        "Backfill starting"
    );

    // Owner records are referenced by any of their identifier values.
    let client_index = identity_index(&clients);
    let company_index = identity_index(&companies);

    let mut summary = BackfillSummary::default();
    let mut client_buckets: HashMap<usize, Vec<Record>> = HashMap::new();
    let mut company_buckets: BTreeMap<(String, String), CompanyBucket> = BTreeMap::new();

    for order in orders {
        if let Some(company_id) = order.lookup("company_id").and_then(value_as_string) {
            let month = BillingMonth::from_datetime(&order_date(&order.fields));
            let (owner_key, identity, company) = match company_index.get(&company_id) {
                Some(&idx) => {
                    let record = &companies[idx];
                    let fields = record.snapshot();
                    let identity = preferred_identifier(&fields, &company_id);
                    (record.id.clone(), identity, fields)
                }
                // No company record: fall back to the snapshot embedded
                // in the order, or a minimal map built from the id.
                None => (
                    company_id.clone(),
                    company_id.clone(),
                    embedded_company(&order, &company_id),
                ),
            };
            company_buckets
                .entry((owner_key, month.key()))
                .or_insert_with(|| CompanyBucket {
                    identity,
                    company,
                    orders: Vec::new(),
                })
                .orders
                .push(order);
        } else {
            match resolve_client(&order, &client_index) {
                Some(idx) => client_buckets.entry(idx).or_default().push(order),
                None => {
                    summary
                        .errors
                        .push(format!("order {}: no resolvable client or company", order.id));
                }
            }
        }
    }

    for (idx, orders) in client_buckets {
        let client = &clients[idx];
        match process_orders(store, client, &orders).await {
            Ok(created) => summary.client_invoices_created += created.len(),
            Err(e) => {
                JOB_ERRORS_TOTAL.with_label_values(&["backfill"]).inc();
                summary
                    .errors
                    .push(format!("client {}: {}", client.id, e));
            }
        }
    }

    for ((_, month_key), bucket) in company_buckets {
        let month = match BillingMonth::parse(&month_key) {
            Ok(month) => month,
            Err(e) => {
                summary.errors.push(format!("month {}: {}", month_key, e));
                continue;
            }
        };
        match generate_company_monthly_invoice(
            store,
            &bucket.identity,
            month,
            &bucket.orders,
            &bucket.company,
        )
        .await
        {
            Ok(outcome) => {
                if outcome.is_created() {
                    summary.company_invoices_created += 1;
                }
            }
            Err(e) => {
                JOB_ERRORS_TOTAL.with_label_values(&["backfill"]).inc();
                summary.errors.push(format!(
                    "company {} month {}: {}",
                    bucket.identity, month_key, e
                ));
            }
        }
    }

    tracing::info!(
        client_invoices = summary.client_invoices_created,
        company_invoices = summary.company_invoices_created,
        errors = summary.errors.len(),
        "Backfill finished"
    );
    Ok(summary)
}

/// Map every identifier value of every record to its index.
fn identity_index(records: &[Record]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        for value in record.identity_values() {
            index.entry(value).or_insert(i);
        }
    }
    index
}

fn resolve_client(order: &Record, index: &HashMap<String, usize>) -> Option<usize> {
    ["client_id", "client_email"]
        .iter()
        .filter_map(|field| order.lookup(field).and_then(value_as_string))
        .find_map(|value| index.get(&value).copied())
}

fn embedded_company(order: &Record, company_id: &str) -> Fields {
    if let Some(Value::Object(map)) = order.lookup("company") {
        let mut fields = map.clone();
        fields
            .entry("id".to_string())
            .or_insert_with(|| Value::String(company_id.to_string()));
        return fields;
    }
    let mut fields = Fields::new();
    fields.insert("id".to_string(), Value::String(company_id.to_string()));
    fields
}
