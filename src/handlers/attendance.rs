use crate::dtos::attendance::{AttendanceDayQuery, MarkAttendanceRequest};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::MarkAttendance;
use crate::utils::ValidatedJson;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

/// Upsert today's mark for one intern. Re-marking the same day overwrites.
pub async fn mark_attendance(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<MarkAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .db
        .mark_attendance(&MarkAttendance::from(req), user.0.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn attendance_for_day(
    State(state): State<AppState>,
    Query(query): Query<AttendanceDayQuery>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.db.attendance_for_day(query.day).await?;
    Ok(Json(records))
}
