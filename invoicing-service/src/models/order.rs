//! Field access over heterogeneous order records.
//!
//! Upstream order documents were written by several generations of the
//! back office, so every interesting value may live under one of several
//! field names. Each resolution chain is an explicit ordered list so the
//! precedence is documented and testable on its own.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// Schemaless document body.
pub type Fields = Map<String, Value>;

/// Product display name, in resolution order.
pub const PRODUCT_FIELDS: &[&str] = &[
    "selected_option.title",
    "product.title",
    "product_name",
    "service.title",
    "category",
];

/// Quantity, in resolution order.
pub const QUANTITY_FIELDS: &[&str] = &["quantity", "liters_total", "liters", "amount"];

/// Gross order total (VAT included), in resolution order.
pub const TOTAL_FIELDS: &[&str] = &["total_price", "total", "price"];

/// Order date, in resolution order.
pub const DATE_FIELDS: &[&str] = &["delivered_at", "created_at"];

/// Placeholder product name when every source field is empty.
pub const UNSPECIFIED_PRODUCT: &str = "unspecified product";

/// Uniform shape extracted from any order record.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOrder {
    pub product: String,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub amount_before_tax: Decimal,
}

/// Resolve a dotted path (`"selected_option.title"`) inside a field map.
pub fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Coerce a value to a non-empty string. Numbers are rendered as-is so
/// numeric identifiers still compare against their string spellings.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a value to a decimal amount.
pub fn value_as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a value to a UTC timestamp (RFC 3339).
pub fn value_as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// First non-empty string along a resolution chain.
pub fn first_str(fields: &Fields, chain: &[&str]) -> Option<String> {
    chain
        .iter()
        .filter_map(|path| lookup(fields, path))
        .find_map(value_as_string)
}

/// First non-zero decimal along a resolution chain. Zero and empty values
/// fall through to the next field.
pub fn first_decimal(fields: &Fields, chain: &[&str]) -> Option<Decimal> {
    chain
        .iter()
        .filter_map(|path| lookup(fields, path))
        .filter_map(value_as_decimal)
        .find(|d| !d.is_zero())
}

/// The order's date: delivery date, then creation date, then now.
pub fn order_date(fields: &Fields) -> DateTime<Utc> {
    DATE_FIELDS
        .iter()
        .filter_map(|path| lookup(fields, path))
        .find_map(value_as_datetime)
        .unwrap_or_else(Utc::now)
}
