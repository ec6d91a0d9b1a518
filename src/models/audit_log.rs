//! Append-only audit history for receipt mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Create,
    Update,
    Void,
    PartialPayment,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Void => "VOID",
            AuditAction::PartialPayment => "PARTIAL_PAYMENT",
        }
    }
}

/// One entry per accepted mutating operation, written in the same
/// transaction as the mutation it documents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    pub audit_id: Uuid,
    pub receipt_id: Uuid,
    pub action: String,
    pub actor_id: Uuid,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}
