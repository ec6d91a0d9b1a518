use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "absent" => AttendanceStatus::Absent,
            "late" => AttendanceStatus::Late,
            "excused" => AttendanceStatus::Excused,
            _ => AttendanceStatus::Present,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub attendance_id: Uuid,
    pub intern_id: Uuid,
    pub day: NaiveDate,
    pub status: String,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub recorded_utc: DateTime<Utc>,
}

/// Attendance row joined with intern names, as loaded for day listings and
/// the Excel export.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceListing {
    pub attendance_id: Uuid,
    pub intern_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub day: NaiveDate,
    pub status: String,
    pub notes: Option<String>,
    pub recorded_utc: DateTime<Utc>,
}

/// Upsert input: one record per intern per day.
#[derive(Debug, Clone)]
pub struct MarkAttendance {
    pub intern_id: Uuid,
    pub day: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}
