//! Per-order invoice generation for individual clients.

use std::collections::HashSet;

use anyhow::anyhow;
use serde_json::to_value;
use service_core::error::AppError;
use tracing::instrument;

use crate::models::{
    lookup, order_date, value_as_string, Fields, Invoice, InvoiceItem, InvoiceType,
};
use crate::services::allocator;
use crate::services::catalog::{find_client_by_identity, invoices_for_owner, orders_for_client};
use crate::services::metrics::{INVOICES_GENERATED_TOTAL, JOB_ERRORS_TOTAL};
use crate::services::normalizer::{normalize, round_money, vat_of};
use crate::services::store::{Record, RecordStore, INVOICES};

/// Client-side reference spellings, tried before the order's own.
const CLIENT_REF_FIELDS: &[&str] = &["ref_id", "refid", "reference_id"];

/// Build and persist one invoice for one order. Errors propagate to the
/// caller, who decides batch-vs-single semantics.
#[instrument(skip(store, order, client), fields(order_id = %order.id))]
pub async fn generate_client_invoice<S: RecordStore + 'static>(
    store: &S,
    order: &Record,
    client: &Record,
) -> Result<Invoice, AppError> {
    let created_at = order_date(&order.fields);
    let invoice_number = allocator::allocate(store).await;

    let normalized = normalize(&order.fields);
    let amount_before_tax = round_money(normalized.amount_before_tax);
    let vat = round_money(vat_of(normalized.amount_before_tax));
    let total = amount_before_tax + vat;

    let item = InvoiceItem {
        product: normalized.product,
        quantity: normalized.quantity,
        price_per_unit: round_money(normalized.price_per_unit),
        amount_before_tax,
        vat,
        total,
    };

    let mut invoice = Invoice {
        id: None,
        invoice_number,
        invoice_type: InvoiceType::Client,
        created_at,
        client_data: Some(client.snapshot()),
        company_data: None,
        order_id: Some(order.id.clone()),
        ref_id: resolve_ref_id(&client.fields, &order.fields),
        month_name: None,
        orders: None,
        items: vec![item],
        subtotal: amount_before_tax,
        vat_amount: vat,
        total,
    };

    let value = to_value(&invoice)
        .map_err(|e| AppError::InternalError(anyhow!("unencodable invoice: {}", e)))?;
    let record = store.insert(INVOICES, value).await?;
    invoice.id = Some(record.id);

    INVOICES_GENERATED_TOTAL
        .with_label_values(&[InvoiceType::Client.as_str()])
        .inc();
    tracing::info!(
        invoice_id = %invoice.id.as_deref().unwrap_or(""),
        invoice_number = %invoice.invoice_number,
        "Client invoice created"
    );

    Ok(invoice)
}

/// Generate invoices for every not-yet-invoiced order of one client.
/// Safe to re-run arbitrarily often: it only ever adds missing invoices.
#[instrument(skip(store))]
pub async fn process_client_orders<S: RecordStore + 'static>(
    store: &S,
    client_identity: &str,
) -> Result<Vec<String>, AppError> {
    let client = find_client_by_identity(store, client_identity)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("client '{}' not found", client_identity)))?;
    let orders = orders_for_client(store, &client.identity_values()).await?;
    process_orders(store, &client, &orders).await
}

/// Batch path shared with the backfill runner: skip orders that already
/// have an invoice, generate the rest with per-order error isolation.
pub async fn process_orders<S: RecordStore + 'static>(
    store: &S,
    client: &Record,
    orders: &[Record],
) -> Result<Vec<String>, AppError> {
    let existing = invoices_for_owner(
        store,
        InvoiceType::Client.as_str(),
        "client_data",
        &client.identity_values(),
    )
    .await?;
    let invoiced: HashSet<String> = existing
        .iter()
        .filter_map(|r| r.lookup("order_id").and_then(value_as_string))
        .collect();

    let mut created = Vec::new();
    for order in orders {
        if invoiced.contains(&order.id) {
            tracing::debug!(order_id = %order.id, "Order already invoiced, skipping");
            continue;
        }
        match generate_client_invoice(store, order, client).await {
            Ok(invoice) => {
                if let Some(id) = invoice.id {
                    created.push(id);
                }
            }
            Err(e) => {
                JOB_ERRORS_TOTAL
                    .with_label_values(&["client_invoice"])
                    .inc();
                tracing::error!(
                    order_id = %order.id,
                    error = %e,
                    "Failed to generate client invoice, continuing batch"
                );
            }
        }
    }
    Ok(created)
}

/// Reference code fallback chain: client's own reference, then its
/// alternate spellings, then the order's reference, then none.
fn resolve_ref_id(client: &Fields, order: &Fields) -> Option<String> {
    CLIENT_REF_FIELDS
        .iter()
        .filter_map(|field| lookup(client, field))
        .find_map(value_as_string)
        .or_else(|| lookup(order, "ref_id").and_then(value_as_string))
}
