//! Domain models for invoicing-service.

mod identity;
mod invoice;
mod month;
mod order;
mod summary;

pub use identity::{
    identities_match, identity_values, preferred_identifier, IDENTITY_FIELDS,
};
pub use invoice::{Invoice, InvoiceItem, InvoiceType};
pub use month::BillingMonth;
pub use order::{
    first_decimal, first_str, lookup, order_date, value_as_datetime, value_as_decimal,
    value_as_string, Fields, NormalizedOrder, DATE_FIELDS, PRODUCT_FIELDS, QUANTITY_FIELDS,
    TOTAL_FIELDS, UNSPECIFIED_PRODUCT,
};
pub use summary::{BackfillSummary, DuplicateGroupDetail, ReconcileSummary};
