//! Company monthly aggregation tests.

mod common;

use common::{assert_no_nulls, dump, seed, seed_company, seed_company_order, store};
use invoicing_service::models::{BillingMonth, InvoiceType};
use invoicing_service::services::monthly_invoices::process_company_monthly_invoices;
use invoicing_service::services::store::{INVOICES, ORDERS};
use rust_decimal::Decimal;
use serde_json::{json, Value};

#[tokio::test]
async fn orders_aggregate_into_items_by_product() {
    let store = store();
    seed_company(&store, "co-1", "fleet@co.test").await;
    seed_company_order(&store, "co-1", "A", 10.0, 115.0, "2024-03-02T08:00:00Z").await;
    seed_company_order(&store, "co-1", "A", 20.0, 230.0, "2024-03-14T08:00:00Z").await;
    seed_company_order(&store, "co-1", "B", 5.0, 57.5, "2024-03-20T08:00:00Z").await;

    let month = BillingMonth::new(2024, 3).expect("valid month");
    let outcome = process_company_monthly_invoices(&store, "co-1", month)
        .await
        .expect("Failed to generate monthly invoice");
    assert!(outcome.is_created());

    let invoice = outcome.invoice();
    assert_eq!(invoice.invoice_type, InvoiceType::CompanyMonthly);
    assert_eq!(invoice.month_name.as_deref(), Some("March 2024"));
    assert_eq!(invoice.created_at.to_rfc3339(), "2024-03-31T00:00:00+00:00");
    assert_eq!(invoice.orders.as_ref().map(Vec::len), Some(3));

    assert_eq!(invoice.items.len(), 2);
    let a = invoice
        .items
        .iter()
        .find(|i| i.product == "A")
        .expect("Missing item A");
    assert_eq!(a.quantity, Decimal::from(30));
    assert_eq!(a.amount_before_tax, Decimal::from(300));
    assert_eq!(a.vat, Decimal::from(45));
    assert_eq!(a.total, Decimal::from(345));

    let b = invoice
        .items
        .iter()
        .find(|i| i.product == "B")
        .expect("Missing item B");
    assert_eq!(b.amount_before_tax, Decimal::from(50));
    assert_eq!(b.vat, Decimal::new(75, 1));
    assert_eq!(b.total, Decimal::new(575, 1));

    assert_eq!(invoice.subtotal, Decimal::from(350));
    assert_eq!(invoice.vat_amount, Decimal::new(525, 1));
    assert_eq!(invoice.total, Decimal::new(4025, 1));
}

#[tokio::test]
async fn regeneration_returns_the_existing_invoice_across_identity_fields() {
    let store = store();
    seed_company(&store, "co-1", "fleet@co.test").await;
    seed_company_order(&store, "co-1", "A", 10.0, 115.0, "2024-03-02T08:00:00Z").await;

    let month = BillingMonth::new(2024, 3).expect("valid month");
    let first = process_company_monthly_invoices(&store, "co-1", month)
        .await
        .expect("First run failed");
    assert!(first.is_created());

    // Same company, now referenced by email instead of uid.
    let second = process_company_monthly_invoices(&store, "fleet@co.test", month)
        .await
        .expect("Second run failed");
    assert!(!second.is_created());
    assert_eq!(second.invoice().id, first.invoice().id);
    assert_eq!(dump(&store, INVOICES).await.len(), 1);
}

#[tokio::test]
async fn orders_outside_the_month_are_excluded() {
    let store = store();
    seed_company(&store, "co-1", "fleet@co.test").await;
    seed_company_order(&store, "co-1", "A", 10.0, 115.0, "2024-03-02T08:00:00Z").await;
    seed_company_order(&store, "co-1", "A", 10.0, 115.0, "2024-04-01T08:00:00Z").await;

    let month = BillingMonth::new(2024, 3).expect("valid month");
    let outcome = process_company_monthly_invoices(&store, "co-1", month)
        .await
        .expect("Failed to generate monthly invoice");

    let invoice = outcome.invoice();
    assert_eq!(invoice.orders.as_ref().map(Vec::len), Some(1));
    assert_eq!(invoice.subtotal, Decimal::from(100));
}

#[tokio::test]
async fn order_snapshots_are_stored_without_null_fields() {
    let store = store();
    seed_company(&store, "co-1", "fleet@co.test").await;
    seed(
        &store,
        ORDERS,
        json!({
            "company_id": "co-1",
            "product_name": "Diesel",
            "quantity": 10,
            "total_price": 115,
            "delivered_at": "2024-03-02T08:00:00Z",
            "dispatch_notes": null,
        }),
    )
    .await;

    let month = BillingMonth::new(2024, 3).expect("valid month");
    process_company_monthly_invoices(&store, "co-1", month)
        .await
        .expect("Failed to generate monthly invoice");

    let records = dump(&store, INVOICES).await;
    assert_eq!(records.len(), 1);
    assert_no_nulls(&Value::Object(records[0].fields.clone()));

    let snapshots = records[0]
        .lookup("orders")
        .and_then(Value::as_array)
        .expect("Missing order snapshots");
    assert!(snapshots[0].get("dispatch_notes").is_none());
    assert!(snapshots[0].get("id").is_some());
}

#[tokio::test]
async fn different_months_get_separate_invoices() {
    let store = store();
    seed_company(&store, "co-1", "fleet@co.test").await;
    seed_company_order(&store, "co-1", "A", 10.0, 115.0, "2024-03-02T08:00:00Z").await;
    seed_company_order(&store, "co-1", "A", 10.0, 115.0, "2024-04-02T08:00:00Z").await;

    let march = BillingMonth::new(2024, 3).expect("valid month");
    let april = BillingMonth::new(2024, 4).expect("valid month");
    assert!(process_company_monthly_invoices(&store, "co-1", march)
        .await
        .expect("March run failed")
        .is_created());
    assert!(process_company_monthly_invoices(&store, "co-1", april)
        .await
        .expect("April run failed")
        .is_created());
    assert_eq!(dump(&store, INVOICES).await.len(), 2);
}
