//! Order normalization tests: resolution chains, VAT arithmetic,
//! rounding.

use invoicing_service::models::{Fields, UNSPECIFIED_PRODUCT};
use invoicing_service::services::normalizer::{normalize, round_money, vat_of};
use rust_decimal::Decimal;
use serde_json::json;

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().expect("fixture must be an object").clone()
}

#[test]
fn product_prefers_selected_option_title() {
    let order = fields(json!({
        "selected_option": { "title": "Diesel 50ppm" },
        "product_name": "Diesel",
        "category": "fuel",
    }));

    assert_eq!(normalize(&order).product, "Diesel 50ppm");
}

#[test]
fn product_falls_back_along_the_chain() {
    let order = fields(json!({
        "selected_option": { "title": "  " },
        "service": { "title": "Generator refill" },
    }));
    assert_eq!(normalize(&order).product, "Generator refill");

    let empty = fields(json!({}));
    assert_eq!(normalize(&empty).product, UNSPECIFIED_PRODUCT);
}

#[test]
fn quantity_skips_zero_values() {
    let order = fields(json!({
        "quantity": 0,
        "liters_total": 250,
        "total_price": 1000,
    }));

    assert_eq!(normalize(&order).quantity, Decimal::from(250));
}

#[test]
fn amount_before_tax_strips_vat_from_the_gross_total() {
    let order = fields(json!({
        "quantity": 10,
        "total_price": 115,
    }));

    let normalized = normalize(&order);
    assert_eq!(normalized.amount_before_tax, Decimal::from(100));
    assert_eq!(vat_of(normalized.amount_before_tax), Decimal::from(15));
}

#[test]
fn price_per_unit_is_gross_over_quantity() {
    let order = fields(json!({
        "quantity": 10,
        "total_price": 115,
    }));
    assert_eq!(normalize(&order).price_per_unit, Decimal::new(115, 1));

    let no_quantity = fields(json!({ "total_price": 115 }));
    assert_eq!(normalize(&no_quantity).price_per_unit, Decimal::ZERO);
}

#[test]
fn string_amounts_parse() {
    let order = fields(json!({
        "quantity": "25",
        "total": "57.5",
    }));

    let normalized = normalize(&order);
    assert_eq!(normalized.quantity, Decimal::from(25));
    assert_eq!(normalized.amount_before_tax, Decimal::from(50));
}

#[test]
fn money_rounds_midpoint_away_from_zero() {
    assert_eq!(round_money(Decimal::new(2675, 3)), Decimal::new(268, 2));
    assert_eq!(round_money(Decimal::new(-2675, 3)), Decimal::new(-268, 2));
    assert_eq!(round_money(Decimal::new(1234, 2)), Decimal::new(1234, 2));
}
