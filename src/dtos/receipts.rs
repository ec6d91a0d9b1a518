use crate::models::{
    CreatePayment, CreateReceipt, PaymentType, ReceiptDetail, ReceiptSummary,
    SearchReceiptsFilter, UpdateReceipt,
};
use crate::models::Payment;
use crate::services::ledger::{self, PaymentStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn parse_payment_type(raw: &str) -> PaymentType {
    PaymentType::from_string(raw)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReceiptRequest {
    pub intern_id: Uuid,
    pub payment_date: NaiveDate,

    #[validate(length(min = 1, message = "Payment type is required"))]
    pub payment_type: String,

    pub fee_type_description: Option<String>,
    pub payment_description: Option<String>,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,

    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,

    pub received_by: Option<String>,
    pub notes: Option<String>,
}

impl From<CreateReceiptRequest> for CreateReceipt {
    fn from(req: CreateReceiptRequest) -> Self {
        CreateReceipt {
            intern_id: req.intern_id,
            payment_date: req.payment_date,
            payment_type: parse_payment_type(&req.payment_type),
            fee_type_description: req.fee_type_description,
            payment_description: req.payment_description,
            amount_due: req.amount_due,
            amount_paid: req.amount_paid,
            payment_method: req.payment_method,
            received_by: req.received_by,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReceiptRequest {
    pub payment_date: NaiveDate,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,

    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,

    pub received_by: Option<String>,
    pub notes: Option<String>,
}

impl From<UpdateReceiptRequest> for UpdateReceipt {
    fn from(req: UpdateReceiptRequest) -> Self {
        UpdateReceipt {
            payment_date: req.payment_date,
            amount_due: req.amount_due,
            amount_paid: req.amount_paid,
            payment_method: req.payment_method,
            received_by: req.received_by,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct VoidReceiptRequest {
    #[validate(length(min = 1, message = "Void reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddPaymentRequest {
    pub amount: Decimal,

    #[validate(length(min = 1, message = "Payment method is required"))]
    pub method: String,

    pub paid_on: NaiveDate,
    pub notes: Option<String>,
}

impl From<AddPaymentRequest> for CreatePayment {
    fn from(req: AddPaymentRequest) -> Self {
        CreatePayment {
            amount: req.amount,
            method: req.method,
            paid_on: req.paid_on,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchReceiptsQuery {
    pub q: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub payment_type: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl From<SearchReceiptsQuery> for SearchReceiptsFilter {
    fn from(query: SearchReceiptsQuery) -> Self {
        SearchReceiptsFilter {
            query: query.q,
            start_date: query.start_date,
            end_date: query.end_date,
            payment_type: query.payment_type.as_deref().map(parse_payment_type),
            min_amount: query.min_amount,
            max_amount: query.max_amount,
            page: query.page.unwrap_or(1),
            page_size: query.page_size.unwrap_or(25).clamp(1, 100),
        }
    }
}

/// List/search row with the payment status derived at read time.
#[derive(Debug, Serialize)]
pub struct ReceiptSummaryResponse {
    #[serde(flatten)]
    pub summary: ReceiptSummary,
    pub payment_status: PaymentStatus,
    pub total_paid: Decimal,
    pub remaining_balance: Decimal,
}

impl From<ReceiptSummary> for ReceiptSummaryResponse {
    fn from(summary: ReceiptSummary) -> Self {
        let installments = [summary.partial_total];
        let payment_status =
            ledger::payment_status(summary.amount_due, summary.amount_paid, &installments);
        let total_paid =
            ledger::total_paid(summary.amount_due, summary.amount_paid, &installments);
        let remaining_balance =
            ledger::remaining_balance(summary.amount_due, summary.amount_paid, &installments);
        ReceiptSummaryResponse {
            summary,
            payment_status,
            total_paid,
            remaining_balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PagedReceiptsResponse {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub receipts: Vec<ReceiptSummaryResponse>,
}

/// Full receipt with installment history and derived ledger figures.
#[derive(Debug, Serialize)]
pub struct ReceiptDetailResponse {
    #[serde(flatten)]
    pub detail: ReceiptDetail,
    pub payment_status: PaymentStatus,
    pub total_paid: Decimal,
    pub remaining_balance: Decimal,
    pub payments: Vec<Payment>,
}

impl ReceiptDetailResponse {
    pub fn derive(detail: ReceiptDetail, payments: Vec<Payment>) -> Self {
        let installments: Vec<Decimal> = payments.iter().map(|p| p.amount).collect();
        let payment_status = ledger::payment_status(
            detail.receipt.amount_due,
            detail.receipt.amount_paid,
            &installments,
        );
        let total_paid = ledger::total_paid(
            detail.receipt.amount_due,
            detail.receipt.amount_paid,
            &installments,
        );
        let remaining_balance = ledger::remaining_balance(
            detail.receipt.amount_due,
            detail.receipt.amount_paid,
            &installments,
        );
        ReceiptDetailResponse {
            detail,
            payment_status,
            total_paid,
            remaining_balance,
            payments,
        }
    }
}
