use crate::dtos::interns::{RegisterInternRequest, SearchInternsQuery, UpdateInternRequest};
use crate::dtos::receipts::ReceiptSummaryResponse;
use crate::error::AppError;
use crate::models::{CreateIntern, OutboxKind, UpdateIntern};
use crate::services::outbox;
use crate::utils::ValidatedJson;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

/// Register an intern and enqueue the welcome letter in one transaction.
pub async fn register_intern(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterInternRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = CreateIntern::from(req);

    let mut tx = state.db.pool().begin().await?;
    let intern = state.db.create_intern_on(&mut tx, &input).await?;
    outbox::enqueue(
        &mut tx,
        OutboxKind::InternWelcome,
        None,
        Some(intern.intern_id),
        &intern.email,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(intern_id = %intern.intern_id, "Intern registered");

    Ok((StatusCode::CREATED, Json(intern)))
}

pub async fn list_interns(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let interns = state.db.list_interns().await?;
    Ok(Json(interns))
}

/// Typeahead search used by the receipt form; active interns only.
pub async fn search_interns(
    State(state): State<AppState>,
    Query(query): Query<SearchInternsQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.q.trim().len() < 2 {
        return Ok(Json(Vec::new()));
    }
    let interns = state.db.search_interns(query.q.trim()).await?;
    Ok(Json(interns))
}

pub async fn get_intern(
    State(state): State<AppState>,
    Path(intern_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let intern = state
        .db
        .get_intern(intern_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Intern not found")))?;
    Ok(Json(intern))
}

/// Payment history for one intern: active receipts with ledger-derived
/// totals, newest first.
pub async fn intern_receipts(
    State(state): State<AppState>,
    Path(intern_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if state.db.get_intern(intern_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Intern not found")));
    }

    let receipts: Vec<ReceiptSummaryResponse> = state
        .receipts
        .list_for_intern(intern_id)
        .await?
        .into_iter()
        .map(ReceiptSummaryResponse::from)
        .collect();

    Ok(Json(receipts))
}

pub async fn update_intern(
    State(state): State<AppState>,
    Path(intern_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateInternRequest>,
) -> Result<impl IntoResponse, AppError> {
    let intern = state
        .db
        .update_intern(intern_id, &UpdateIntern::from(req))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Intern not found")))?;
    Ok(Json(intern))
}
