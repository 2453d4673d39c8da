//! Invoice model for invoicing-service.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;

use crate::models::order::Fields;

/// Invoice type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Client,
    CompanyMonthly,
    /// Produced elsewhere; this core only ever reads it.
    Subscription,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Client => "client",
            InvoiceType::CompanyMonthly => "company_monthly",
            InvoiceType::Subscription => "subscription",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "company_monthly" => InvoiceType::CompanyMonthly,
            "subscription" => InvoiceType::Subscription,
            _ => InvoiceType::Client,
        }
    }
}

/// Line item on an invoice. All amounts are rounded to 2 decimal places
/// before persistence; `total = amount_before_tax + vat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub product: String,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub amount_before_tax: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}

/// Invoice document. Created once by a generator, never mutated, only
/// ever removed again by duplicate reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Store-assigned identity; absent until the document is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 8-digit decimal string, globally unique among invoices.
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    /// Client invoices: the order's date. Company-monthly invoices: the
    /// last calendar day of the invoiced month.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_data: Option<Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_data: Option<Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// `"<MonthName> <Year>"`, company-monthly only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_name: Option<String>,
    /// Normalized order snapshots folded into a company-monthly invoice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Fields>>,
    pub items: Vec<InvoiceItem>,
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
}

impl Invoice {
    /// Rehydrate an invoice from a stored document body.
    pub fn from_fields(id: &str, fields: &Fields) -> Result<Self, AppError> {
        let mut invoice: Invoice = serde_json::from_value(Value::Object(fields.clone()))
            .map_err(|e| AppError::InternalError(anyhow!("malformed invoice document: {}", e)))?;
        invoice.id = Some(id.to_string());
        Ok(invoice)
    }
}
