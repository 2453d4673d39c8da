//! Duplicate reconciliation for company-monthly invoices.
//!
//! Historical generation races left some companies with several
//! invoices for the same month, often under different identity keys.
//! This job finds those groups, keeps the most recent invoice of each,
//! and deletes the rest.

use std::collections::HashSet;

use service_core::error::AppError;
use tracing::instrument;

use crate::models::{
    identity_values, preferred_identifier, BillingMonth, DuplicateGroupDetail, Invoice,
    InvoiceType, ReconcileSummary,
};
use crate::services::catalog::all_companies;
use crate::services::metrics::{DUPLICATES_DELETED_TOTAL, JOB_ERRORS_TOTAL};
use crate::services::store::{filter_eq, RecordStore, INVOICES};

/// One invoice with its precomputed grouping facts.
struct Candidate {
    invoice: Invoice,
    identifier: String,
    identities: HashSet<String>,
    month_key: String,
    month_name: String,
}

/// Find and remove duplicate company-monthly invoices.
///
/// Grouping happens in two passes. A coarse pass buckets invoices by
/// (preferred identifier, year-month, month label); a merge pass then
/// joins buckets of the same month whose identity-value sets intersect,
/// so a company invoiced once under its uid and once under its email
/// still forms a single group. Within each group the invoice with the
/// newest `created_at` survives. Re-running on a clean store is a no-op.
#[instrument(skip(store))]
pub async fn reconcile_monthly_invoices<S: RecordStore + 'static>(
    store: &S,
) -> Result<ReconcileSummary, AppError> {
    let records = store
        .find(
            INVOICES,
            filter_eq("invoice_type", InvoiceType::CompanyMonthly.as_str()),
        )
        .await?;
    tracing::info!(invoices = records.len(), "Reconciliation starting");

    // Company records are the link between identity spellings: an
    // invoice stamped with a uid and one stamped with an email belong
    // together when one company record carries both values.
    let rosters: Vec<HashSet<String>> = all_companies(store)
        .await?
        .iter()
        .map(|record| record.identity_values().into_iter().collect())
        .collect();

    let mut summary = ReconcileSummary::default();
    let mut candidates = Vec::new();
    for record in &records {
        match Invoice::from_fields(&record.id, &record.fields) {
            Ok(invoice) => candidates.push(candidate(invoice, &rosters)),
            Err(e) => {
                summary
                    .errors
                    .push(format!("invoice {}: {}", record.id, e));
            }
        }
    }

    let coarse = coarse_groups(candidates);
    let merged = merge_groups(coarse);

    for group in merged {
        if group.len() < 2 {
            continue;
        }
        let mut group = group;
        // Newest invoice survives; ties keep the first found.
        group.sort_by(|a, b| b.invoice.created_at.cmp(&a.invoice.created_at));
        let kept = &group[0];
        let kept_id = kept.invoice.id.clone().unwrap_or_default();
        let mut deleted_ids = Vec::new();

        for duplicate in &group[1..] {
            summary.total_duplicates += 1;
            let Some(id) = duplicate.invoice.id.as_deref() else {
                continue;
            };
            match store.delete(INVOICES, id).await {
                Ok(()) => {
                    DUPLICATES_DELETED_TOTAL.inc();
                    summary.deleted_count += 1;
                    deleted_ids.push(id.to_string());
                    tracing::info!(
                        invoice_id = %id,
                        kept_invoice_id = %kept_id,
                        company = %kept.identifier,
                        month = %kept.month_name,
                        "Duplicate monthly invoice deleted"
                    );
                }
                Err(e) => {
                    JOB_ERRORS_TOTAL.with_label_values(&["reconcile"]).inc();
                    summary.errors.push(format!("invoice {}: {}", id, e));
                }
            }
        }

        summary.details.push(DuplicateGroupDetail {
            company: kept.identifier.clone(),
            month: kept.month_name.clone(),
            kept_invoice_id: kept_id,
            deleted_invoice_ids: deleted_ids,
        });
    }

    tracing::info!(
        duplicates = summary.total_duplicates,
        deleted = summary.deleted_count,
        errors = summary.errors.len(),
        "Reconciliation finished"
    );
    Ok(summary)
}

fn candidate(invoice: Invoice, rosters: &[HashSet<String>]) -> Candidate {
    let (identifier, mut identities): (String, HashSet<String>) = match &invoice.company_data {
        Some(data) => (
            preferred_identifier(data, ""),
            identity_values(data).into_iter().collect(),
        ),
        None => (String::new(), HashSet::new()),
    };
    for roster in rosters {
        if roster.intersection(&identities).next().is_some() {
            identities.extend(roster.iter().cloned());
        }
    }
    let month_key = BillingMonth::from_datetime(&invoice.created_at).key();
    let month_name = invoice.month_name.clone().unwrap_or_default();
    Candidate {
        invoice,
        identifier,
        identities,
        month_key,
        month_name,
    }
}

/// Bucket by (preferred identifier, year-month, month label). Invoices
/// with no resolvable identifier never group with anything.
fn coarse_groups(candidates: Vec<Candidate>) -> Vec<Vec<Candidate>> {
    let mut groups: Vec<Vec<Candidate>> = Vec::new();
    for candidate in candidates {
        let slot = if candidate.identifier.is_empty() {
            None
        } else {
            groups.iter_mut().find(|g| {
                let head = &g[0];
                head.identifier == candidate.identifier
                    && head.month_key == candidate.month_key
                    && head.month_name == candidate.month_name
            })
        };
        match slot {
            Some(group) => group.push(candidate),
            None => groups.push(vec![candidate]),
        }
    }
    groups
}

/// Join coarse groups of the same month whose identity-value sets
/// intersect. Each pass folds every joinable group into the cluster
/// before it is sealed, so chained identities (A∩B, B∩C) still end up
/// in one group.
fn merge_groups(mut groups: Vec<Vec<Candidate>>) -> Vec<Vec<Candidate>> {
    let mut merged: Vec<Vec<Candidate>> = Vec::new();
    while let Some(seed) = groups.pop() {
        let mut cluster = seed;
        let mut identities: HashSet<String> =
            cluster.iter().flat_map(|c| c.identities.clone()).collect();
        loop {
            let Some(pos) = groups.iter().position(|g| joinable(g, &cluster, &identities)) else {
                break;
            };
            let joined = groups.swap_remove(pos);
            for candidate in &joined {
                identities.extend(candidate.identities.iter().cloned());
            }
            cluster.extend(joined);
        }
        merged.push(cluster);
    }
    merged
}

fn joinable(group: &[Candidate], cluster: &[Candidate], identities: &HashSet<String>) -> bool {
    let same_month = group[0].month_key == cluster[0].month_key
        && group[0].month_name == cluster[0].month_name;
    if !same_month {
        return false;
    }
    group
        .iter()
        .any(|c| c.identities.iter().any(|v| identities.contains(v)))
}
