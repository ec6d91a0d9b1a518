pub mod admins;
pub mod attendance;
pub mod auth;
pub mod exports;
pub mod health;
pub mod interns;
pub mod receipts;

pub use health::{health_check, metrics_handler};
