//! Durable outbox rows for document/email side effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxKind {
    ReceiptCreated,
    ReceiptUpdated,
    InternWelcome,
}

impl OutboxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxKind::ReceiptCreated => "receipt_created",
            OutboxKind::ReceiptUpdated => "receipt_updated",
            OutboxKind::InternWelcome => "intern_welcome",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "receipt_updated" => OutboxKind::ReceiptUpdated,
            "intern_welcome" => OutboxKind::InternWelcome,
            _ => OutboxKind::ReceiptCreated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboxEntry {
    pub outbox_id: Uuid,
    pub receipt_id: Option<Uuid>,
    pub intern_id: Option<Uuid>,
    pub kind: String,
    pub recipient: String,
    pub status: String,
    pub attempts: i32,
    pub next_attempt_utc: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub sent_utc: Option<DateTime<Utc>>,
}
