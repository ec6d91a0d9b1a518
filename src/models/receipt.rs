//! Receipt model: one billing record for an intern's fee obligation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Terminal receipt state. `Void` replaces deletion; voided receipts stay
/// queryable by id/number but drop out of default listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Active,
    Void,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Active => "active",
            ReceiptStatus::Void => "void",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "void" => ReceiptStatus::Void,
            _ => ReceiptStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Tuition,
    OtherFees,
    Custom,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Tuition => "tuition",
            PaymentType::OtherFees => "other_fees",
            PaymentType::Custom => "custom",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "other_fees" => PaymentType::OtherFees,
            "custom" => PaymentType::Custom,
            _ => PaymentType::Tuition,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Receipt {
    pub receipt_id: Uuid,
    pub receipt_number: String,
    pub intern_id: Uuid,
    pub payment_date: NaiveDate,
    pub payment_type: String,
    pub fee_type_description: Option<String>,
    pub payment_description: Option<String>,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub payment_method: String,
    pub received_by: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub void_reason: Option<String>,
    pub voided_utc: Option<DateTime<Utc>>,
    pub voided_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: Option<DateTime<Utc>>,
}

/// Listing projection joined with the owning intern.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReceiptSummary {
    pub receipt_id: Uuid,
    pub receipt_number: String,
    pub first_name: String,
    pub last_name: String,
    pub payment_type: String,
    pub payment_date: NaiveDate,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub partial_total: Decimal,
    pub status: String,
}

/// Full receipt joined with intern contact details, as loaded for the
/// detail/print paths.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReceiptDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub receipt: Receipt,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Input for creating a receipt.
#[derive(Debug, Clone)]
pub struct CreateReceipt {
    pub intern_id: Uuid,
    pub payment_date: NaiveDate,
    pub payment_type: PaymentType,
    pub fee_type_description: Option<String>,
    pub payment_description: Option<String>,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub payment_method: String,
    pub received_by: Option<String>,
    pub notes: Option<String>,
}

/// Fields overwritten by the update operation.
#[derive(Debug, Clone)]
pub struct UpdateReceipt {
    pub payment_date: NaiveDate,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub payment_method: String,
    pub received_by: Option<String>,
    pub notes: Option<String>,
}

/// Search parameters; void receipts are always excluded here.
#[derive(Debug, Clone, Default)]
pub struct SearchReceiptsFilter {
    pub query: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub payment_type: Option<PaymentType>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub page: i64,
    pub page_size: i64,
}
