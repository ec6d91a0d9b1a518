//! PDF generation for receipts and welcome letters.
//!
//! Documents are rendered in-process and handed to the email provider as
//! attachments. Voided receipts render with a diagonal VOID watermark and
//! the recorded reason, so a regenerated copy can never pass for a live
//! receipt.

use crate::config::ReceiptConfig;
use crate::error::AppError;
use crate::models::{Payment, ReceiptDetail, ReceiptStatus};
use crate::services::ledger;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Point, Polygon, Pt,
    Rgb, TextMatrix,
};
use qrcode::{Color as QrColor, QrCode};
use rust_decimal::Decimal;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;

fn pdf_err(e: impl std::fmt::Display) -> AppError {
    AppError::InternalError(anyhow::anyhow!("PDF generation failed: {}", e))
}

/// Render a receipt as an A4 PDF.
pub fn render_receipt(
    detail: &ReceiptDetail,
    payments: &[Payment],
    config: &ReceiptConfig,
) -> Result<Vec<u8>, AppError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Receipt {}", detail.receipt.receipt_number),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "receipt",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_err)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_err)?;

    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    layer.set_fill_color(Color::Rgb(Rgb::new(0.1, 0.1, 0.35, None)));
    layer.use_text(&config.organization_name, 20.0, Mm(MARGIN_MM), Mm(y), &bold);
    y -= 8.0;
    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    layer.use_text("Internship Payment Receipt", 12.0, Mm(MARGIN_MM), Mm(y), &font);
    y -= 14.0;

    let installment_amounts: Vec<Decimal> = payments.iter().map(|p| p.amount).collect();
    let total_paid = ledger::total_paid(
        detail.receipt.amount_due,
        detail.receipt.amount_paid,
        &installment_amounts,
    );
    let remaining = ledger::remaining_balance(
        detail.receipt.amount_due,
        detail.receipt.amount_paid,
        &installment_amounts,
    );
    let status = ledger::payment_status(
        detail.receipt.amount_due,
        detail.receipt.amount_paid,
        &installment_amounts,
    );

    let rows = [
        ("Receipt No".to_string(), detail.receipt.receipt_number.clone()),
        (
            "Date".to_string(),
            detail.receipt.payment_date.format("%Y-%m-%d").to_string(),
        ),
        (
            "Intern".to_string(),
            format!("{} {}", detail.first_name, detail.last_name),
        ),
        ("Email".to_string(), detail.email.clone()),
        ("Payment Type".to_string(), detail.receipt.payment_type.clone()),
        ("Method".to_string(), detail.receipt.payment_method.clone()),
        (
            "Amount Due".to_string(),
            format_money(detail.receipt.amount_due, &config.currency),
        ),
        (
            "Total Paid".to_string(),
            format_money(total_paid, &config.currency),
        ),
        (
            "Remaining".to_string(),
            format_money(remaining, &config.currency),
        ),
        ("Status".to_string(), status.as_str().to_string()),
        (
            "Received By".to_string(),
            detail.receipt.received_by.clone().unwrap_or_default(),
        ),
    ];

    for (label, value) in &rows {
        layer.use_text(label.as_str(), 10.0, Mm(MARGIN_MM), Mm(y), &bold);
        layer.use_text(value.as_str(), 10.0, Mm(MARGIN_MM + 45.0), Mm(y), &font);
        y -= 7.0;
    }

    if !payments.is_empty() {
        y -= 6.0;
        layer.use_text("Installments", 11.0, Mm(MARGIN_MM), Mm(y), &bold);
        y -= 7.0;
        for payment in payments {
            let line = format!(
                "{}  {}  ({})",
                payment.paid_on.format("%Y-%m-%d"),
                format_money(payment.amount, &config.currency),
                payment.method
            );
            layer.use_text(line.as_str(), 9.0, Mm(MARGIN_MM + 4.0), Mm(y), &font);
            y -= 5.5;
        }
    }

    draw_qr(
        &layer,
        &detail.receipt.receipt_number,
        PAGE_WIDTH_MM - MARGIN_MM - 30.0,
        PAGE_HEIGHT_MM - MARGIN_MM - 30.0,
        30.0,
    )?;

    if ReceiptStatus::from_string(&detail.receipt.status) == ReceiptStatus::Void {
        draw_void_watermark(&layer, &bold, detail.receipt.void_reason.as_deref());
    }

    doc.save_to_bytes().map_err(pdf_err)
}

/// One-page welcome letter attached to the registration email.
pub fn render_welcome_letter(
    first_name: &str,
    last_name: &str,
    department: &str,
    config: &ReceiptConfig,
) -> Result<Vec<u8>, AppError> {
    let (doc, page, layer) = PdfDocument::new(
        "Welcome Letter",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "letter",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_err)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_err)?;

    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
    layer.set_fill_color(Color::Rgb(Rgb::new(0.1, 0.1, 0.35, None)));
    layer.use_text(&config.organization_name, 20.0, Mm(MARGIN_MM), Mm(y), &bold);
    y -= 16.0;

    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    let lines = [
        format!("Dear {} {},", first_name, last_name),
        String::new(),
        format!(
            "Welcome to the {} internship program.",
            config.organization_name
        ),
        format!("You have been assigned to the {} department.", department),
        String::new(),
        "Please keep this letter for your records and present it on your".to_string(),
        "first day along with a valid photo ID.".to_string(),
    ];
    for line in &lines {
        if !line.is_empty() {
            layer.use_text(line.as_str(), 11.0, Mm(MARGIN_MM), Mm(y), &font);
        }
        y -= 7.0;
    }

    doc.save_to_bytes().map_err(pdf_err)
}

/// Draw the QR payload as filled squares. The payload is the receipt number,
/// which is what the front desk scans to pull a receipt up.
fn draw_qr(
    layer: &PdfLayerReference,
    payload: &str,
    x_mm: f32,
    y_mm: f32,
    size_mm: f32,
) -> Result<(), AppError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("QR encoding failed: {}", e)))?;
    let width = code.width();
    let module = size_mm / width as f32;
    let colors = code.to_colors();

    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    for (idx, color) in colors.iter().enumerate() {
        if *color != QrColor::Dark {
            continue;
        }
        let col = (idx % width) as f32;
        // QR rows count downward, PDF y counts upward
        let row = (idx / width) as f32;
        let x0 = x_mm + col * module;
        let y0 = y_mm + size_mm - (row + 1.0) * module;
        let square = Polygon {
            rings: vec![vec![
                (Point::new(Mm(x0), Mm(y0)), false),
                (Point::new(Mm(x0 + module), Mm(y0)), false),
                (Point::new(Mm(x0 + module), Mm(y0 + module)), false),
                (Point::new(Mm(x0), Mm(y0 + module)), false),
            ]],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        };
        layer.add_polygon(square);
    }

    Ok(())
}

fn draw_void_watermark(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    reason: Option<&str>,
) {
    layer.begin_text_section();
    layer.set_fill_color(Color::Rgb(Rgb::new(0.85, 0.2, 0.2, None)));
    layer.set_font(font, 72.0);
    layer.set_text_matrix(TextMatrix::TranslateRotate(
        Pt(150.0),
        Pt(300.0),
        45.0,
    ));
    layer.write_text("VOID", font);
    layer.end_text_section();

    if let Some(reason) = reason {
        layer.set_fill_color(Color::Rgb(Rgb::new(0.85, 0.2, 0.2, None)));
        layer.use_text(
            format!("Voided: {}", reason),
            10.0,
            Mm(MARGIN_MM),
            Mm(MARGIN_MM),
            font,
        );
    }
}

fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{} {}", amount.round_dp(2), currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Receipt;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn test_config() -> ReceiptConfig {
        ReceiptConfig {
            number_prefix: "ETS".to_string(),
            currency: "XAF".to_string(),
            organization_name: "ETS NTECH".to_string(),
        }
    }

    fn test_detail(status: &str) -> ReceiptDetail {
        ReceiptDetail {
            receipt: Receipt {
                receipt_id: Uuid::new_v4(),
                receipt_number: "ETS/2026/08/001".to_string(),
                intern_id: Uuid::new_v4(),
                payment_date: NaiveDate::from_ymd_opt(2026, 8, 14).unwrap(),
                payment_type: "tuition".to_string(),
                fee_type_description: None,
                payment_description: Some("August tuition".to_string()),
                amount_due: dec!(50000),
                amount_paid: dec!(20000),
                payment_method: "cash".to_string(),
                received_by: Some("Front Desk".to_string()),
                notes: None,
                status: status.to_string(),
                void_reason: (status == "void").then(|| "duplicate entry".to_string()),
                voided_utc: None,
                voided_by: None,
                created_by: Uuid::new_v4(),
                created_utc: Utc::now(),
                updated_utc: None,
            },
            first_name: "Amina".to_string(),
            last_name: "Diallo".to_string(),
            email: "amina@example.com".to_string(),
            phone: "+237600000000".to_string(),
        }
    }

    #[test]
    fn renders_active_receipt_pdf() {
        let bytes = render_receipt(&test_detail("active"), &[], &test_config()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn renders_void_receipt_pdf() {
        let bytes = render_receipt(&test_detail("void"), &[], &test_config()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_welcome_letter() {
        let bytes =
            render_welcome_letter("Amina", "Diallo", "Engineering", &test_config()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
