pub mod allocator;
pub mod backfill;
pub mod catalog;
pub mod client_invoices;
pub mod memory;
pub mod metrics;
pub mod mongo;
pub mod monthly_invoices;
pub mod normalizer;
pub mod reconciler;
pub mod store;

pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use mongo::MongoStore;
pub use store::{Record, RecordStore};
