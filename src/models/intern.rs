//! Intern model for the registration module.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Intern lifecycle status. Interns are never hard-deleted; deactivation
/// flips this to `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternStatus {
    Active,
    Inactive,
}

impl InternStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InternStatus::Active => "active",
            InternStatus::Inactive => "inactive",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "inactive" => InternStatus::Inactive,
            _ => InternStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Intern {
    pub intern_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub school: String,
    pub degree: String,
    pub year_of_study: String,
    pub gpa: Option<Decimal>,
    pub department: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub mentor: Option<String>,
    pub skills: String,
    pub notes: Option<String>,
    pub registration_date: NaiveDate,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

/// Input for registering a new intern.
#[derive(Debug, Clone)]
pub struct CreateIntern {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub school: String,
    pub degree: String,
    pub year_of_study: String,
    pub gpa: Option<Decimal>,
    pub department: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub mentor: Option<String>,
    pub skills: String,
    pub notes: Option<String>,
}

/// Partial update applied by admin edits; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateIntern {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub degree: Option<String>,
    pub year_of_study: Option<String>,
    pub gpa: Option<Decimal>,
    pub department: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub mentor: Option<String>,
    pub skills: Option<String>,
    pub notes: Option<String>,
    pub status: Option<InternStatus>,
}
