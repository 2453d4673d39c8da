use invoicing_service::config::InvoicingConfig;
use invoicing_service::models::BillingMonth;
use invoicing_service::services::{
    backfill, client_invoices, get_metrics, init_metrics, monthly_invoices, reconciler, MongoStore,
};
use serde_json::json;
use service_core::observability::init_tracing;

fn usage() -> std::io::Error {
    std::io::Error::other(
        "usage: invoicing-service <backfill | reconcile | client-orders <identity> | company-month <identity> <YYYY-MM>>",
    )
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize metrics recorder (must be before any metrics are recorded)
    init_metrics();

    let config = InvoicingConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing("invoicing-service", &config.common.log_level);

    let store = MongoStore::connect(&config.mongodb.uri, &config.mongodb.database)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            std::io::Error::other(format!("Database connection error: {}", e))
        })?;

    store.initialize_indexes().await.map_err(|e| {
        tracing::error!("Failed to initialize database indexes: {}", e);
        std::io::Error::other(format!("Database initialization error: {}", e))
    })?;

    store.health_check().await.map_err(|e| {
        tracing::error!("MongoDB health check failed: {}", e);
        std::io::Error::other(format!("Database health error: {}", e))
    })?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let summary = match args.first().map(String::as_str) {
        Some("backfill") => {
            let summary = backfill::run_backfill(&store)
                .await
                .map_err(|e| std::io::Error::other(format!("Backfill failed: {}", e)))?;
            serde_json::to_value(&summary).unwrap_or_default()
        }
        Some("reconcile") => {
            let summary = reconciler::reconcile_monthly_invoices(&store)
                .await
                .map_err(|e| std::io::Error::other(format!("Reconciliation failed: {}", e)))?;
            serde_json::to_value(&summary).unwrap_or_default()
        }
        Some("client-orders") => {
            let identity = args.get(1).ok_or_else(usage)?;
            let created = client_invoices::process_client_orders(&store, identity)
                .await
                .map_err(|e| std::io::Error::other(format!("Client invoicing failed: {}", e)))?;
            json!({ "client": identity, "invoices_created": created })
        }
        Some("company-month") => {
            let identity = args.get(1).ok_or_else(usage)?;
            let month = args
                .get(2)
                .ok_or_else(usage)
                .and_then(|raw| BillingMonth::parse(raw).map_err(|e| std::io::Error::other(e.to_string())))?;
            let outcome =
                monthly_invoices::process_company_monthly_invoices(&store, identity, month)
                    .await
                    .map_err(|e| {
                        std::io::Error::other(format!("Monthly invoicing failed: {}", e))
                    })?;
            json!({
                "company": identity,
                "month": month.key(),
                "created": outcome.is_created(),
                "invoice_id": outcome.invoice().id,
                "invoice_number": outcome.invoice().invoice_number,
            })
        }
        _ => return Err(usage()),
    };

    // Operator audit trail: the summary goes to stdout, logs to stderr.
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).unwrap_or_default()
    );
    tracing::debug!(metrics = %get_metrics(), "Run metrics");

    Ok(())
}
