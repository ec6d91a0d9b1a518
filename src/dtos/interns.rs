use crate::models::{CreateIntern, InternStatus, UpdateIntern};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Phone numbers arrive in assorted national formats; require at least 9
/// digits and ignore separators.
fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 9 {
        let mut err = ValidationError::new("phone_digits");
        err.message = Some("Phone must contain at least 9 digits".into());
        return Err(err);
    }
    Ok(())
}

fn validate_internship_dates(req: &RegisterInternRequest) -> Result<(), ValidationError> {
    if req.start_date >= req.end_date {
        let mut err = ValidationError::new("date_range");
        err.message = Some("Start date must be before end date".into());
        return Err(err);
    }
    Ok(())
}

fn validate_update_dates(req: &UpdateInternRequest) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (req.start_date, req.end_date) {
        if start >= end {
            let mut err = ValidationError::new("date_range");
            err.message = Some("Start date must be before end date".into());
            return Err(err);
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_internship_dates"))]
pub struct RegisterInternRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_phone"))]
    pub phone: String,

    #[validate(length(min = 1, message = "School is required"))]
    pub school: String,

    #[validate(length(min = 1, message = "Degree is required"))]
    pub degree: String,

    #[validate(length(min = 1, message = "Year of study is required"))]
    pub year_of_study: String,

    pub gpa: Option<Decimal>,

    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub mentor: Option<String>,

    #[validate(length(min = 1, message = "Skills are required"))]
    pub skills: String,

    pub notes: Option<String>,
}

impl From<RegisterInternRequest> for CreateIntern {
    fn from(req: RegisterInternRequest) -> Self {
        CreateIntern {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            school: req.school,
            degree: req.degree,
            year_of_study: req.year_of_study,
            gpa: req.gpa,
            department: req.department,
            start_date: req.start_date,
            end_date: req.end_date,
            mentor: req.mentor,
            skills: req.skills,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate, Default)]
#[validate(schema(function = "validate_update_dates"))]
pub struct UpdateInternRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,

    #[validate(custom(function = "validate_phone"))]
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
    pub status: Option<String>,
}

impl From<UpdateInternRequest> for UpdateIntern {
    fn from(req: UpdateInternRequest) -> Self {
        UpdateIntern {
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            school: req.school,
            degree: req.degree,
            year_of_study: req.year_of_study,
            gpa: req.gpa,
            department: req.department,
            start_date: req.start_date,
            end_date: req.end_date,
            mentor: req.mentor,
            skills: req.skills,
            notes: req.notes,
            status: req.status.as_deref().map(InternStatus::from_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchInternsQuery {
    pub q: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegisterInternRequest {
        RegisterInternRequest {
            first_name: "Amina".to_string(),
            last_name: "Diallo".to_string(),
            email: "amina@example.com".to_string(),
            phone: "+221 77 000 00 00".to_string(),
            school: "ESP Dakar".to_string(),
            degree: "Licence".to_string(),
            year_of_study: "3".to_string(),
            gpa: None,
            department: "Engineering".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            mentor: None,
            skills: "Rust".to_string(),
            notes: None,
        }
    }

    #[test]
    fn accepts_well_formed_registration() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn rejects_phone_without_enough_digits() {
        let mut req = registration();
        req.phone = "abc".to_string();
        let errs = req.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("phone"));

        req.phone = "77 00 11".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_inverted_date_range() {
        let mut req = registration();
        req.start_date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        req.end_date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(req.validate().is_err());

        // zero-length internships are rejected too
        req.end_date = req.start_date;
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_checks_phone_and_dates_when_present() {
        let mut req = UpdateInternRequest {
            phone: Some("12345".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        req.phone = None;
        req.start_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        req.end_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        assert!(req.validate().is_err());

        req.end_date = NaiveDate::from_ymd_opt(2026, 12, 1);
        assert!(req.validate().is_ok());
    }
}
