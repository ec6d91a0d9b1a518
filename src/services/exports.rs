//! Tabular exports: receipts and interns as CSV, attendance as an Excel
//! workbook.
//!
//! Builders are pure over already-loaded rows so they can be exercised
//! without a database.

use crate::error::AppError;
use crate::models::{AttendanceListing, Intern, ReceiptSummary};
use crate::services::ledger;
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatBorder, Workbook};

/// Receipts listing as CSV. Voided receipts never reach this builder; the
/// caller queries active rows only.
pub fn receipts_csv(receipts: &[ReceiptSummary]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "Receipt Number",
            "Intern",
            "Payment Type",
            "Payment Date",
            "Amount Due",
            "Total Paid",
            "Remaining",
            "Status",
        ])
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("CSV write failed: {}", e)))?;

    for receipt in receipts {
        let installments = [receipt.partial_total];
        let total_paid =
            ledger::total_paid(receipt.amount_due, receipt.amount_paid, &installments);
        let remaining =
            ledger::remaining_balance(receipt.amount_due, receipt.amount_paid, &installments);
        let status =
            ledger::payment_status(receipt.amount_due, receipt.amount_paid, &installments);

        writer
            .write_record([
                receipt.receipt_number.as_str(),
                &format!("{} {}", receipt.first_name, receipt.last_name),
                receipt.payment_type.as_str(),
                &receipt.payment_date.format("%Y-%m-%d").to_string(),
                &receipt.amount_due.to_string(),
                &total_paid.to_string(),
                &remaining.to_string(),
                status.as_str(),
            ])
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("CSV write failed: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("CSV flush failed: {}", e)))
}

/// Intern roster as CSV.
pub fn interns_csv(interns: &[Intern]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "First Name",
            "Last Name",
            "Email",
            "Phone",
            "School",
            "Degree",
            "Department",
            "Start Date",
            "End Date",
            "Mentor",
            "Status",
        ])
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("CSV write failed: {}", e)))?;

    for intern in interns {
        writer
            .write_record([
                intern.first_name.as_str(),
                intern.last_name.as_str(),
                intern.email.as_str(),
                intern.phone.as_str(),
                intern.school.as_str(),
                intern.degree.as_str(),
                intern.department.as_str(),
                &intern.start_date.format("%Y-%m-%d").to_string(),
                &intern.end_date.format("%Y-%m-%d").to_string(),
                intern.mentor.as_deref().unwrap_or(""),
                intern.status.as_str(),
            ])
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("CSV write failed: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("CSV flush failed: {}", e)))
}

/// Attendance for a day range as an Excel workbook, one row per mark.
pub fn attendance_workbook(
    records: &[AttendanceListing],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet
        .set_name("Attendance")
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Workbook failed: {}", e)))?;

    let header_format = Format::new().set_bold().set_border(FormatBorder::Thin);

    let title = format!(
        "Attendance {} to {}",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );
    sheet
        .write_string(0, 0, &title)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Workbook failed: {}", e)))?;

    let headers = ["Date", "Intern", "Status", "Notes"];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(2, col as u16, *header, &header_format)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Workbook failed: {}", e)))?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 3;
        let cells = [
            record.day.format("%Y-%m-%d").to_string(),
            format!("{} {}", record.first_name, record.last_name),
            record.status.clone(),
            record.notes.clone().unwrap_or_default(),
        ];
        for (col, value) in cells.iter().enumerate() {
            sheet
                .write_string(row, col as u16, value)
                .map_err(|e| AppError::InternalError(anyhow::anyhow!("Workbook failed: {}", e)))?;
        }
    }

    sheet
        .autofit();

    workbook
        .save_to_buffer()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Workbook save failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn summary(number: &str, due: &str, paid: &str, partial: &str) -> ReceiptSummary {
        ReceiptSummary {
            receipt_id: Uuid::new_v4(),
            receipt_number: number.to_string(),
            first_name: "Amina".to_string(),
            last_name: "Diallo".to_string(),
            payment_type: "tuition".to_string(),
            payment_date: NaiveDate::from_ymd_opt(2026, 8, 14).unwrap(),
            amount_due: due.parse().unwrap(),
            amount_paid: paid.parse().unwrap(),
            partial_total: partial.parse().unwrap(),
            status: "active".to_string(),
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let rows = vec![
            summary("ETS/2026/08/001", "50000", "20000", "0"),
            summary("ETS/2026/08/002", "50000", "20000", "30000"),
        ];
        let bytes = receipts_csv(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Receipt Number"));
        assert!(lines[1].contains("ETS/2026/08/001"));
        assert!(lines[1].contains("pending_payment"));
        assert!(lines[2].contains("paid_in_full"));
    }

    #[test]
    fn csv_empty_is_header_only() {
        let bytes = receipts_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn interns_csv_quotes_commas() {
        let intern = Intern {
            intern_id: Uuid::new_v4(),
            first_name: "Amina".to_string(),
            last_name: "Diallo".to_string(),
            email: "amina@example.com".to_string(),
            phone: "+221770000000".to_string(),
            school: "ESP, Dakar".to_string(),
            degree: "Licence".to_string(),
            year_of_study: "3".to_string(),
            gpa: None,
            department: "Engineering".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            mentor: None,
            skills: "Rust".to_string(),
            notes: None,
            registration_date: NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
            status: "active".to_string(),
            created_utc: chrono::Utc::now(),
        };
        let bytes = interns_csv(std::slice::from_ref(&intern)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 2);
        // comma inside the school name forces quoting
        assert!(text.contains("\"ESP, Dakar\""));
    }

    #[test]
    fn workbook_is_valid_zip() {
        let records = vec![AttendanceListing {
            attendance_id: Uuid::new_v4(),
            intern_id: Uuid::new_v4(),
            first_name: "Amina".to_string(),
            last_name: "Diallo".to_string(),
            day: NaiveDate::from_ymd_opt(2026, 8, 14).unwrap(),
            status: "present".to_string(),
            notes: None,
            recorded_utc: chrono::Utc::now(),
        }];
        let start = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let bytes = attendance_workbook(&records, start, end).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }
}
