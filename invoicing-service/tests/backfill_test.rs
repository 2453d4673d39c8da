//! Backfill job tests: partitioning, grouping, error isolation.

mod common;

use common::{dump, seed, seed_client, seed_client_order, seed_company, seed_company_order, store};
use invoicing_service::services::backfill::run_backfill;
use invoicing_service::services::store::{INVOICES, ORDERS};
use serde_json::json;

#[tokio::test]
async fn backfill_partitions_orders_by_owner() {
    let store = store();
    seed_client(&store, "client-1", "driver@fleet.test").await;
    seed_client_order(&store, "client-1", 115.0, "2024-03-05T08:30:00Z").await;

    seed_company(&store, "co-1", "fleet@co.test").await;
    seed_company_order(&store, "co-1", "A", 10.0, 115.0, "2024-03-02T08:00:00Z").await;
    seed_company_order(&store, "co-1", "A", 20.0, 230.0, "2024-03-14T08:00:00Z").await;
    seed_company_order(&store, "co-1", "A", 10.0, 115.0, "2024-04-02T08:00:00Z").await;

    // No matching client record and no company reference.
    seed(
        &store,
        ORDERS,
        json!({ "client_id": "ghost", "total_price": 10 }),
    )
    .await;

    let summary = run_backfill(&store).await.expect("Backfill failed");

    assert_eq!(summary.client_invoices_created, 1);
    // One invoice per (company, month): March and April.
    assert_eq!(summary.company_invoices_created, 2);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("no resolvable client or company"));
    assert_eq!(dump(&store, INVOICES).await.len(), 3);
}

#[tokio::test]
async fn rerunning_backfill_creates_nothing_new() {
    let store = store();
    seed_client(&store, "client-1", "driver@fleet.test").await;
    seed_client_order(&store, "client-1", 115.0, "2024-03-05T08:30:00Z").await;
    seed_company(&store, "co-1", "fleet@co.test").await;
    seed_company_order(&store, "co-1", "A", 10.0, 115.0, "2024-03-02T08:00:00Z").await;

    let first = run_backfill(&store).await.expect("First backfill failed");
    assert_eq!(first.client_invoices_created, 1);
    assert_eq!(first.company_invoices_created, 1);

    let second = run_backfill(&store).await.expect("Second backfill failed");
    assert_eq!(second.client_invoices_created, 0);
    assert_eq!(second.company_invoices_created, 0);
    assert_eq!(dump(&store, INVOICES).await.len(), 2);
}

#[tokio::test]
async fn company_without_a_record_uses_the_embedded_snapshot() {
    let store = store();
    seed(
        &store,
        ORDERS,
        json!({
            "company_id": "co-legacy",
            "company": { "uid": "co-legacy", "name": "Legacy Fleet" },
            "product_name": "Diesel",
            "quantity": 10,
            "total_price": 115,
            "delivered_at": "2024-03-02T08:00:00Z",
        }),
    )
    .await;

    let summary = run_backfill(&store).await.expect("Backfill failed");
    assert_eq!(summary.company_invoices_created, 1);
    assert!(summary.errors.is_empty());

    let invoices = dump(&store, INVOICES).await;
    assert_eq!(invoices.len(), 1);
    assert_eq!(
        invoices[0].lookup("company_data.uid").and_then(|v| v.as_str()),
        Some("co-legacy")
    );
}
