//! Fuzzy identity handling for clients and companies.
//!
//! Upstream data never settled on a single identifier: the same company
//! may be referenced by its internal uid in one record, its email in
//! another, and a generic id in a third. Matching therefore works over
//! the full set of identifier values rather than a single key.

use crate::models::order::{lookup, value_as_string, Fields};

/// Fields that may carry an owner identifier, in preference order.
pub const IDENTITY_FIELDS: &[&str] = &["uid", "email", "id", "external_id"];

/// Every identifier value present on a record, deduplicated.
pub fn identity_values(fields: &Fields) -> Vec<String> {
    let mut values = Vec::new();
    for field in IDENTITY_FIELDS {
        if let Some(value) = lookup(fields, field).and_then(value_as_string) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

/// The single identifier chosen to represent a record: uid, then email,
/// then generic id, then the caller-supplied fallback.
pub fn preferred_identifier(fields: &Fields, fallback: &str) -> String {
    for field in &["uid", "email", "id"] {
        if let Some(value) = lookup(fields, field).and_then(value_as_string) {
            return value;
        }
    }
    fallback.to_string()
}

/// True when any identifier value on one record equals any identifier
/// value on the other, regardless of which field carries it.
pub fn identities_match(a: &Fields, b: &Fields) -> bool {
    let a_values = identity_values(a);
    if a_values.is_empty() {
        return false;
    }
    identity_values(b).iter().any(|v| a_values.contains(v))
}
