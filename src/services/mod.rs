pub mod audit;
pub mod database;
pub mod documents;
pub mod email;
pub mod exports;
pub mod ledger;
pub mod metrics;
pub mod outbox;
pub mod receipts;
pub mod sequence;

pub use database::Database;
pub use receipts::{ReceiptRef, ReceiptService};
