//! Partial payment (installment) applied against a receipt.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One installment. Immutable once recorded; there is no edit or delete.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub receipt_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub paid_on: NaiveDate,
    pub recorded_by: Uuid,
    pub recorded_utc: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Input for recording an installment.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub amount: Decimal,
    pub method: String,
    pub paid_on: NaiveDate,
    pub notes: Option<String>,
}
