//! Monthly aggregated invoices for corporate accounts.

use anyhow::anyhow;
use rust_decimal::Decimal;
use serde_json::to_value;
use service_core::error::AppError;
use tracing::instrument;

use crate::models::{
    identities_match, identity_values, order_date, preferred_identifier, BillingMonth, Fields,
    Invoice, InvoiceItem, InvoiceType,
};
use crate::services::allocator;
use crate::services::catalog::{find_company_by_identity, invoices_for_owner, orders_for_company};
use crate::services::metrics::INVOICES_GENERATED_TOTAL;
use crate::services::normalizer::{normalize, round_money, vat_of};
use crate::services::store::{Record, RecordStore, INVOICES};

/// Result of a monthly generation call: either a freshly persisted
/// invoice, or the pre-existing one for that company and month.
#[derive(Debug, Clone)]
pub enum MonthlyInvoiceOutcome {
    Created(Invoice),
    Existing(Invoice),
}

impl MonthlyInvoiceOutcome {
    pub fn invoice(&self) -> &Invoice {
        match self {
            MonthlyInvoiceOutcome::Created(invoice) => invoice,
            MonthlyInvoiceOutcome::Existing(invoice) => invoice,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, MonthlyInvoiceOutcome::Created(_))
    }
}

/// Aggregate one company's orders for one calendar month into a single
/// invoice. If an invoice for that company and month already exists
/// (under any identity key), it is returned unchanged with no write.
#[instrument(skip(store, orders, company), fields(month = %month.key(), order_count = orders.len()))]
pub async fn generate_company_monthly_invoice<S: RecordStore + 'static>(
    store: &S,
    company_identity: &str,
    month: BillingMonth,
    orders: &[Record],
    company: &Fields,
) -> Result<MonthlyInvoiceOutcome, AppError> {
    let month_name = month.label();
    let created_at = month.stamp();
    let company_identifier = preferred_identifier(company, company_identity);

    // Duplicate guard: company identity is inconsistently keyed
    // upstream, so every identifier pairing must be tried before
    // concluding "no existing invoice".
    let mut identities = identity_values(company);
    if !identities.contains(&company_identifier) {
        identities.push(company_identifier.clone());
    }
    let existing = invoices_for_owner(
        store,
        InvoiceType::CompanyMonthly.as_str(),
        "company_data",
        &identities,
    )
    .await?;
    for record in &existing {
        let Ok(invoice) = Invoice::from_fields(&record.id, &record.fields) else {
            continue;
        };
        if matches_company_month(&invoice, &month, &month_name, company, &company_identifier) {
            tracing::debug!(
                invoice_id = %record.id,
                month = %month_name,
                "Monthly invoice already exists, returning it unchanged"
            );
            return Ok(MonthlyInvoiceOutcome::Existing(invoice));
        }
    }

    let invoice_number = allocator::allocate(store).await;

    // Merge line items by product. The first occurrence seeds the item;
    // later ones accumulate amounts. price_per_unit keeps the first
    // order's value as the representative unit price.
    let mut items: Vec<InvoiceItem> = Vec::new();
    for order in orders {
        let normalized = normalize(&order.fields);
        let vat = vat_of(normalized.amount_before_tax);
        match items.iter_mut().find(|i| i.product == normalized.product) {
            Some(item) => {
                item.quantity += normalized.quantity;
                item.amount_before_tax += normalized.amount_before_tax;
                item.vat += vat;
                item.total += normalized.amount_before_tax + vat;
            }
            None => items.push(InvoiceItem {
                product: normalized.product,
                quantity: normalized.quantity,
                price_per_unit: normalized.price_per_unit,
                amount_before_tax: normalized.amount_before_tax,
                vat,
                total: normalized.amount_before_tax + vat,
            }),
        }
    }
    for item in &mut items {
        item.price_per_unit = round_money(item.price_per_unit);
        item.amount_before_tax = round_money(item.amount_before_tax);
        item.vat = round_money(item.vat);
        item.total = round_money(item.total);
    }

    let subtotal: Decimal = items.iter().map(|i| i.amount_before_tax).sum();
    let vat_amount: Decimal = items.iter().map(|i| i.vat).sum();
    let total: Decimal = items.iter().map(|i| i.total).sum();

    let order_snapshots: Vec<Fields> = orders.iter().map(Record::snapshot).collect();

    let mut invoice = Invoice {
        id: None,
        invoice_number,
        invoice_type: InvoiceType::CompanyMonthly,
        created_at,
        client_data: None,
        company_data: Some(company.clone()),
        order_id: None,
        ref_id: None,
        month_name: Some(month_name.clone()),
        orders: Some(order_snapshots),
        items,
        subtotal,
        vat_amount,
        total,
    };

    let value = to_value(&invoice)
        .map_err(|e| AppError::InternalError(anyhow!("unencodable invoice: {}", e)))?;
    let record = store.insert(INVOICES, value).await?;
    invoice.id = Some(record.id);

    INVOICES_GENERATED_TOTAL
        .with_label_values(&[InvoiceType::CompanyMonthly.as_str()])
        .inc();
    tracing::info!(
        invoice_id = %invoice.id.as_deref().unwrap_or(""),
        invoice_number = %invoice.invoice_number,
        month = %month_name,
        "Company monthly invoice created"
    );

    Ok(MonthlyInvoiceOutcome::Created(invoice))
}

/// Generate (or return) the monthly invoice for one company identified
/// by any of its identifier values.
#[instrument(skip(store), fields(month = %month.key()))]
pub async fn process_company_monthly_invoices<S: RecordStore + 'static>(
    store: &S,
    company_identity: &str,
    month: BillingMonth,
) -> Result<MonthlyInvoiceOutcome, AppError> {
    let company = find_company_by_identity(store, company_identity)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("company '{}' not found", company_identity)))?;
    let orders: Vec<Record> = orders_for_company(store, &company.identity_values())
        .await?
        .into_iter()
        .filter(|order| month.contains(&order_date(&order.fields)))
        .collect();
    generate_company_monthly_invoice(store, company_identity, month, &orders, &company.snapshot())
        .await
}

/// An existing invoice blocks generation when its label, stamped month,
/// and owner identity all line up with the requested company and month.
fn matches_company_month(
    invoice: &Invoice,
    month: &BillingMonth,
    month_name: &str,
    company: &Fields,
    company_identifier: &str,
) -> bool {
    if invoice.month_name.as_deref() != Some(month_name) {
        return false;
    }
    if !month.contains(&invoice.created_at) {
        return false;
    }
    let Some(data) = &invoice.company_data else {
        return false;
    };
    identities_match(data, company)
        || identity_values(data).iter().any(|v| v == company_identifier)
}
