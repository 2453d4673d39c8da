//! Invoice number allocation with collision retry.

use chrono::Utc;
use futures::FutureExt;
use rand::Rng;
use tracing::instrument;

use crate::services::metrics::ALLOCATOR_FALLBACKS_TOTAL;
use crate::services::store::{filter_eq, RecordStore, INVOICES};

const MAX_ATTEMPTS: u32 = 10;
const MIN_NUMBER: u32 = 10_000_000;
const MAX_NUMBER: u32 = 99_999_999;

/// Allocate an 8-digit invoice number not used by any persisted invoice.
///
/// Never fails: if every draw collides, or the store transaction itself
/// fails, a timestamp-derived fallback number is produced instead, so
/// that allocation is never the reason invoice creation fails outright.
#[instrument(skip(store))]
pub async fn allocate<S: RecordStore + 'static>(store: &S) -> String {
    let result = store
        .transaction(|txn| {
            async move {
                for attempt in 1..=MAX_ATTEMPTS {
                    let candidate = draw_candidate();
                    let filter = filter_eq("invoice_number", candidate.as_str());
                    let existing = txn.find(INVOICES, filter).await?;
                    if existing.is_empty() {
                        return Ok(Some(candidate));
                    }
                    tracing::warn!(
                        attempt,
                        candidate = %candidate,
                        "Invoice number collision, redrawing"
                    );
                }
                Ok(None)
            }
            .boxed()
        })
        .await;

    match result {
        Ok(Some(number)) => number,
        Ok(None) => {
            tracing::warn!("All invoice number draws collided, using timestamp fallback");
            degraded_fallback()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Invoice number transaction failed, using timestamp fallback");
            degraded_fallback()
        }
    }
}

fn draw_candidate() -> String {
    let number: u32 = rand::thread_rng().gen_range(MIN_NUMBER..=MAX_NUMBER);
    number.to_string()
}

/// Last 8 digits of the current epoch-millis timestamp, zero padded.
fn degraded_fallback() -> String {
    ALLOCATOR_FALLBACKS_TOTAL.inc();
    let millis = Utc::now().timestamp_millis().unsigned_abs();
    format!("{:08}", millis % 100_000_000)
}
