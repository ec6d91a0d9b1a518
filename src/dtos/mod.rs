pub mod admins;
pub mod attendance;
pub mod auth;
pub mod interns;
pub mod receipts;
