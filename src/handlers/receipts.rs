use crate::dtos::receipts::{
    AddPaymentRequest, CreateReceiptRequest, PagedReceiptsResponse, ReceiptDetailResponse,
    ReceiptSummaryResponse, SearchReceiptsQuery, UpdateReceiptRequest, VoidReceiptRequest,
};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{CreatePayment, CreateReceipt, SearchReceiptsFilter, UpdateReceipt};
use crate::services::{documents, ReceiptRef};
use crate::utils::ValidatedJson;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

pub async fn create_receipt(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateReceiptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state
        .receipts
        .create(&CreateReceipt::from(req), user.0.user_id)
        .await?;
    let response = ReceiptDetailResponse::derive(detail, Vec::new());
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_receipts(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let receipts = state.receipts.list(100).await?;
    let receipts: Vec<ReceiptSummaryResponse> =
        receipts.into_iter().map(ReceiptSummaryResponse::from).collect();
    Ok(Json(receipts))
}

pub async fn search_receipts(
    State(state): State<AppState>,
    Query(query): Query<SearchReceiptsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = SearchReceiptsFilter::from(query);
    let (total, receipts) = state.receipts.search(&filter).await?;
    Ok(Json(PagedReceiptsResponse {
        total,
        page: filter.page.max(1),
        page_size: filter.page_size.clamp(1, 100),
        receipts: receipts.into_iter().map(ReceiptSummaryResponse::from).collect(),
    }))
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let receipt_ref = ReceiptRef::parse(&reference);
    let detail = state
        .receipts
        .get(&receipt_ref)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Receipt not found")))?;
    let payments = state.receipts.payments(detail.receipt.receipt_id).await?;
    Ok(Json(ReceiptDetailResponse::derive(detail, payments)))
}

pub async fn update_receipt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(reference): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateReceiptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt_ref = ReceiptRef::parse(&reference);
    let detail = state
        .receipts
        .update(&receipt_ref, &UpdateReceipt::from(req), user.0.user_id)
        .await?;
    let payments = state.receipts.payments(detail.receipt.receipt_id).await?;
    Ok(Json(ReceiptDetailResponse::derive(detail, payments)))
}

pub async fn void_receipt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(reference): Path<String>,
    ValidatedJson(req): ValidatedJson<VoidReceiptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt_ref = ReceiptRef::parse(&reference);
    state
        .receipts
        .void(&receipt_ref, &req.reason, user.0.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(reference): Path<String>,
    ValidatedJson(req): ValidatedJson<AddPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt_ref = ReceiptRef::parse(&reference);
    let outcome = state
        .receipts
        .add_payment(&receipt_ref, &CreatePayment::from(req), user.0.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn receipt_payments(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let receipt_ref = ReceiptRef::parse(&reference);
    let detail = state
        .receipts
        .get(&receipt_ref)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Receipt not found")))?;
    let payments = state.receipts.payments(detail.receipt.receipt_id).await?;
    Ok(Json(payments))
}

pub async fn receipt_audit_log(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let receipt_ref = ReceiptRef::parse(&reference);
    let detail = state
        .receipts
        .get(&receipt_ref)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Receipt not found")))?;
    let entries = state
        .receipts
        .audit_history(detail.receipt.receipt_id)
        .await?;
    Ok(Json(entries))
}

/// Regenerate the receipt PDF. Voided receipts render with the VOID
/// watermark rather than 404ing, so a copy can always be produced for the
/// paper trail.
pub async fn receipt_pdf(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let receipt_ref = ReceiptRef::parse(&reference);
    let detail = state
        .receipts
        .get(&receipt_ref)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Receipt not found")))?;
    let payments = state.receipts.payments(detail.receipt.receipt_id).await?;

    let filename = format!("{}.pdf", detail.receipt.receipt_number.replace('/', "-"));
    let pdf = documents::render_receipt(&detail, &payments, &state.config.receipts)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        pdf,
    ))
}
