//! Order normalizer: extracts a uniform billing tuple from any order
//! record. Pure and total; every field has a default.

use once_cell::sync::Lazy;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{
    first_decimal, first_str, Fields, NormalizedOrder, PRODUCT_FIELDS, QUANTITY_FIELDS,
    TOTAL_FIELDS, UNSPECIFIED_PRODUCT,
};

/// Fixed VAT rate applied to every invoice.
pub static VAT_RATE: Lazy<Decimal> = Lazy::new(|| Decimal::new(15, 2));

/// Stored order totals already include VAT; dividing by this recovers
/// the before-tax amount.
static VAT_DIVISOR: Lazy<Decimal> = Lazy::new(|| Decimal::ONE + *VAT_RATE);

/// Extract `{product, quantity, price_per_unit, amount_before_tax}`
/// from a heterogeneous order record, following the fixed resolution
/// chains in [`crate::models`].
pub fn normalize(order: &Fields) -> NormalizedOrder {
    let product =
        first_str(order, PRODUCT_FIELDS).unwrap_or_else(|| UNSPECIFIED_PRODUCT.to_string());
    let quantity = first_decimal(order, QUANTITY_FIELDS).unwrap_or(Decimal::ZERO);
    let gross_total = first_decimal(order, TOTAL_FIELDS).unwrap_or(Decimal::ZERO);

    let price_per_unit = if quantity > Decimal::ZERO {
        gross_total / quantity
    } else {
        Decimal::ZERO
    };

    NormalizedOrder {
        product,
        quantity,
        price_per_unit,
        amount_before_tax: gross_total / *VAT_DIVISOR,
    }
}

/// VAT owed on a before-tax amount.
pub fn vat_of(amount_before_tax: Decimal) -> Decimal {
    amount_before_tax * *VAT_RATE
}

/// Monetary rounding convention: 2 decimal places, midpoint away from
/// zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
