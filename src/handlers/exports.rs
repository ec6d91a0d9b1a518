use crate::dtos::attendance::AttendanceRangeQuery;
use crate::error::AppError;
use crate::models::SearchReceiptsFilter;
use crate::services::exports;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct ReceiptsExportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Active receipts in a date range as CSV.
pub async fn export_receipts_csv(
    State(state): State<AppState>,
    Query(query): Query<ReceiptsExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = SearchReceiptsFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        page: 1,
        page_size: 10_000,
        ..Default::default()
    };
    let (_, receipts) = state.receipts.search(&filter).await?;
    let csv = exports::receipts_csv(&receipts)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"receipts.csv\"".to_string(),
            ),
        ],
        csv,
    ))
}

/// Full intern roster as CSV.
pub async fn export_interns_csv(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let interns = state.db.list_interns().await?;
    let csv = exports::interns_csv(&interns)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"interns.csv\"".to_string(),
            ),
        ],
        csv,
    ))
}

/// Attendance in a day range as an Excel workbook.
pub async fn export_attendance_xlsx(
    State(state): State<AppState>,
    Query(query): Query<AttendanceRangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.end < query.start {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "End date must not be before start date"
        )));
    }

    let records = state.db.attendance_range(query.start, query.end).await?;
    let workbook = exports::attendance_workbook(&records, query.start, query.end)?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"attendance.xlsx\"".to_string(),
            ),
        ],
        workbook,
    ))
}
