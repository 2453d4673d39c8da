//! Result summaries returned by the batch jobs.

use serde::Serialize;

/// Outcome of a backfill run. Partial success is expected: every
/// per-entity failure lands in `errors` instead of aborting the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillSummary {
    pub client_invoices_created: usize,
    pub company_invoices_created: usize,
    pub errors: Vec<String>,
}

/// One duplicate group found by the reconciler, for the operator audit
/// trail.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroupDetail {
    pub company: String,
    pub month: String,
    pub kept_invoice_id: String,
    pub deleted_invoice_ids: Vec<String>,
}

/// Outcome of a monthly-invoice reconciliation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileSummary {
    pub total_duplicates: usize,
    pub deleted_count: usize,
    pub errors: Vec<String>,
    pub details: Vec<DuplicateGroupDetail>,
}
