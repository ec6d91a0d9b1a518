//! Receipt number minting.
//!
//! Numbers look like `ETS/2026/08/001`: prefix, year and month of the
//! payment date, and a zero-padded per-month sequence. The sequence comes
//! from an upsert on `receipt_sequences` executed inside the creation
//! transaction; the row lock serializes concurrent creates for the same
//! month, so two transactions can never mint the same number. The UNIQUE
//! constraint on `receipts.receipt_number` remains as a backstop.

use crate::error::AppError;
use chrono::{Datelike, NaiveDate};
use sqlx::PgConnection;

/// Format a receipt number from its parts. Sequences past 999 widen
/// naturally instead of wrapping.
pub fn format_receipt_number(prefix: &str, date: NaiveDate, seq: i32) -> String {
    format!(
        "{}/{:04}/{:02}/{:03}",
        prefix,
        date.year(),
        date.month(),
        seq
    )
}

/// Year-month bucket key, e.g. "202608".
pub fn year_month_key(date: NaiveDate) -> String {
    format!("{:04}{:02}", date.year(), date.month())
}

/// Reserve the next sequence for the payment date's month and return the
/// formatted receipt number. Must be called on the same transaction as the
/// receipt insert so an aborted create does not burn visible numbers for
/// committed readers.
pub async fn next_receipt_number(
    conn: &mut PgConnection,
    prefix: &str,
    payment_date: NaiveDate,
) -> Result<String, AppError> {
    let seq: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO receipt_sequences (year_month, last_seq)
        VALUES ($1, 1)
        ON CONFLICT (year_month)
        DO UPDATE SET last_seq = receipt_sequences.last_seq + 1
        RETURNING last_seq
        "#,
    )
    .bind(year_month_key(payment_date))
    .fetch_one(conn)
    .await
    .map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to reserve receipt sequence: {}", e))
    })?;

    Ok(format_receipt_number(prefix, payment_date, seq))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn number_is_zero_padded_per_month() {
        assert_eq!(
            format_receipt_number("ETS", date(2026, 8, 26), 1),
            "ETS/2026/08/001"
        );
        assert_eq!(
            format_receipt_number("ETS", date(2026, 11, 2), 42),
            "ETS/2026/11/042"
        );
    }

    #[test]
    fn sequence_widens_past_three_digits() {
        assert_eq!(
            format_receipt_number("ETS", date(2026, 1, 15), 1234),
            "ETS/2026/01/1234"
        );
    }

    #[test]
    fn year_month_key_pads_the_month() {
        assert_eq!(year_month_key(date(2026, 3, 1)), "202603");
        assert_eq!(year_month_key(date(2026, 12, 31)), "202612");
    }
}
