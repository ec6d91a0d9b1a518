use crate::models::{AttendanceStatus, MarkAttendance};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct MarkAttendanceRequest {
    pub intern_id: Uuid,
    pub day: NaiveDate,

    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,

    pub notes: Option<String>,
}

impl From<MarkAttendanceRequest> for MarkAttendance {
    fn from(req: MarkAttendanceRequest) -> Self {
        MarkAttendance {
            intern_id: req.intern_id,
            day: req.day,
            status: AttendanceStatus::from_string(&req.status),
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AttendanceDayQuery {
    pub day: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}
