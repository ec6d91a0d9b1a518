//! Receipt lifecycle controller.
//!
//! The only component permitted to mutate receipt, payment, and audit rows.
//! Every operation runs inside one transaction: ledger mutation, audit
//! entry, and outbox enqueue commit together or not at all. Document/email
//! delivery happens after commit in the outbox worker and can never roll a
//! mutation back.

use crate::config::ReceiptConfig;
use crate::error::AppError;
use crate::models::{
    AuditAction, AuditLogEntry, CreatePayment, CreateReceipt, OutboxKind, Payment, ReceiptDetail,
    ReceiptStatus, ReceiptSummary, SearchReceiptsFilter, UpdateReceipt,
};
use crate::services::metrics::{DB_QUERY_DURATION, PAYMENTS_TOTAL, RECEIPTS_TOTAL};
use crate::services::{audit, ledger, outbox, sequence, Database};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use sqlx::PgConnection;
use tracing::{info, instrument};
use uuid::Uuid;

/// Receipts are addressable by surrogate id or by their formatted number.
#[derive(Debug, Clone)]
pub enum ReceiptRef {
    Id(Uuid),
    Number(String),
}

impl ReceiptRef {
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(id) => ReceiptRef::Id(id),
            Err(_) => ReceiptRef::Number(raw.to_string()),
        }
    }
}

/// Result of an accepted installment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub status: ledger::PaymentStatus,
    pub total_paid: Decimal,
    pub remaining_balance: Decimal,
}

const DETAIL_COLUMNS: &str = r#"
    r.receipt_id, r.receipt_number, r.intern_id, r.payment_date, r.payment_type,
    r.fee_type_description, r.payment_description, r.amount_due, r.amount_paid,
    r.payment_method, r.received_by, r.notes, r.status, r.void_reason, r.voided_utc,
    r.voided_by, r.created_by, r.created_utc, r.updated_utc,
    i.first_name, i.last_name, i.email, i.phone
"#;

#[derive(Clone)]
pub struct ReceiptService {
    db: Database,
    config: ReceiptConfig,
}

impl ReceiptService {
    pub fn new(db: Database, config: ReceiptConfig) -> Self {
        Self { db, config }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Create a receipt: mint the number, insert (status active), write the
    /// CREATE audit entry, and enqueue the document/email side effect.
    #[instrument(skip(self, input), fields(intern_id = %input.intern_id))]
    pub async fn create(&self, input: &CreateReceipt, actor: Uuid) -> Result<ReceiptDetail, AppError> {
        if input.amount_due < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Amount due must not be negative"
            )));
        }
        if input.amount_paid < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Amount paid must not be negative"
            )));
        }
        if input.amount_paid > input.amount_due {
            return Err(AppError::OverpaymentRejected {
                remaining: input.amount_due,
            });
        }
        if input.payment_method.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment method is required"
            )));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_receipt"])
            .start_timer();

        let mut tx = self.db.pool().begin().await?;

        let intern_email: Option<String> =
            sqlx::query_scalar("SELECT email FROM interns WHERE intern_id = $1")
                .bind(input.intern_id)
                .fetch_optional(&mut *tx)
                .await?;
        let intern_email =
            intern_email.ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Intern not found")))?;

        let receipt_number = sequence::next_receipt_number(
            &mut tx,
            &self.config.number_prefix,
            input.payment_date,
        )
        .await?;

        let receipt_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO receipts (
                receipt_id, receipt_number, intern_id, payment_date, payment_type,
                fee_type_description, payment_description, amount_due, amount_paid,
                payment_method, received_by, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(receipt_id)
        .bind(&receipt_number)
        .bind(input.intern_id)
        .bind(input.payment_date)
        .bind(input.payment_type.as_str())
        .bind(&input.fee_type_description)
        .bind(&input.payment_description)
        .bind(input.amount_due)
        .bind(input.amount_paid)
        .bind(&input.payment_method)
        .bind(&input.received_by)
        .bind(&input.notes)
        .bind(actor)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create receipt: {}", e)))?;

        audit::record(
            &mut tx,
            receipt_id,
            AuditAction::Create,
            actor,
            None,
            Some(json!({
                "receipt_number": receipt_number,
                "amount_due": input.amount_due,
                "amount_paid": input.amount_paid,
            })),
        )
        .await?;

        outbox::enqueue(
            &mut tx,
            OutboxKind::ReceiptCreated,
            Some(receipt_id),
            Some(input.intern_id),
            &intern_email,
        )
        .await?;

        let detail = load_detail_for_update(&mut tx, &ReceiptRef::Id(receipt_id))
            .await?
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("Created receipt vanished mid-transaction"))
            })?;

        tx.commit().await?;
        timer.observe_duration();

        RECEIPTS_TOTAL
            .with_label_values(&[detail.receipt.payment_method.as_str()])
            .inc();
        info!(receipt_id = %receipt_id, receipt_number = %receipt_number, "Receipt created");

        Ok(detail)
    }

    /// Overwrite payment fields. The ledger invariant is revalidated against
    /// the recorded installments before anything is written.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        receipt_ref: &ReceiptRef,
        input: &UpdateReceipt,
        actor: Uuid,
    ) -> Result<ReceiptDetail, AppError> {
        if input.amount_due < Decimal::ZERO || input.amount_paid < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Amounts must not be negative"
            )));
        }

        let mut tx = self.db.pool().begin().await?;

        let current = load_detail_for_update(&mut tx, receipt_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Receipt not found")))?;

        if ReceiptStatus::from_string(&current.receipt.status) == ReceiptStatus::Void {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Voided receipts cannot be updated"
            )));
        }

        let installments = load_installment_amounts(&mut tx, current.receipt.receipt_id).await?;
        let installment_sum: Decimal = installments.iter().copied().sum();
        if input.amount_paid + installment_sum > input.amount_due {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Stored payments ({}) would exceed the new amount due ({})",
                input.amount_paid + installment_sum,
                input.amount_due
            )));
        }

        sqlx::query(
            r#"
            UPDATE receipts
            SET payment_date = $2, amount_due = $3, amount_paid = $4,
                payment_method = $5, received_by = $6, notes = $7, updated_utc = NOW()
            WHERE receipt_id = $1
            "#,
        )
        .bind(current.receipt.receipt_id)
        .bind(input.payment_date)
        .bind(input.amount_due)
        .bind(input.amount_paid)
        .bind(&input.payment_method)
        .bind(&input.received_by)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update receipt: {}", e)))?;

        audit::record(
            &mut tx,
            current.receipt.receipt_id,
            AuditAction::Update,
            actor,
            Some(json!({
                "amount_due": current.receipt.amount_due,
                "amount_paid": current.receipt.amount_paid,
            })),
            Some(json!({
                "amount_due": input.amount_due,
                "amount_paid": input.amount_paid,
            })),
        )
        .await?;

        let updated = load_detail_for_update(&mut tx, &ReceiptRef::Id(current.receipt.receipt_id))
            .await?
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("Updated receipt vanished mid-transaction"))
            })?;

        tx.commit().await?;

        info!(receipt_id = %updated.receipt.receipt_id, "Receipt updated");

        Ok(updated)
    }

    /// Void a receipt: terminal, non-deleting. Requires a non-empty reason.
    #[instrument(skip(self, reason))]
    pub async fn void(
        &self,
        receipt_ref: &ReceiptRef,
        reason: &str,
        actor: Uuid,
    ) -> Result<(), AppError> {
        if reason.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Void reason is required"
            )));
        }

        let mut tx = self.db.pool().begin().await?;

        let current = load_detail_for_update(&mut tx, receipt_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Receipt not found")))?;

        if ReceiptStatus::from_string(&current.receipt.status) == ReceiptStatus::Void {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Receipt is already void"
            )));
        }

        sqlx::query(
            r#"
            UPDATE receipts
            SET status = 'void', void_reason = $2, voided_utc = NOW(), voided_by = $3
            WHERE receipt_id = $1
            "#,
        )
        .bind(current.receipt.receipt_id)
        .bind(reason)
        .bind(actor)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to void receipt: {}", e)))?;

        audit::record(
            &mut tx,
            current.receipt.receipt_id,
            AuditAction::Void,
            actor,
            None,
            Some(json!({ "void_reason": reason })),
        )
        .await?;

        tx.commit().await?;

        info!(receipt_id = %current.receipt.receipt_id, "Receipt voided");

        Ok(())
    }

    /// Record an installment. On rejection nothing is written and the error
    /// carries the maximum additional amount that may still be applied.
    #[instrument(skip(self, input))]
    pub async fn add_payment(
        &self,
        receipt_ref: &ReceiptRef,
        input: &CreatePayment,
        actor: Uuid,
    ) -> Result<PaymentOutcome, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_payment"])
            .start_timer();

        let mut tx = self.db.pool().begin().await?;

        let current = load_detail_for_update(&mut tx, receipt_ref)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Receipt not found")))?;

        if ReceiptStatus::from_string(&current.receipt.status) == ReceiptStatus::Void {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payments cannot be applied to a voided receipt"
            )));
        }

        let installments = load_installment_amounts(&mut tx, current.receipt.receipt_id).await?;

        ledger::validate_new_payment(
            current.receipt.amount_due,
            current.receipt.amount_paid,
            &installments,
            input.amount,
        )
        .map_err(|violation| {
            PAYMENTS_TOTAL.with_label_values(&["rejected"]).inc();
            match violation {
                ledger::LedgerViolation::NonPositiveAmount => {
                    AppError::BadRequest(anyhow::anyhow!("Payment amount must be greater than zero"))
                }
                ledger::LedgerViolation::Overpayment { remaining } => {
                    AppError::OverpaymentRejected { remaining }
                }
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, receipt_id, amount, method, paid_on, recorded_by, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(current.receipt.receipt_id)
        .bind(input.amount)
        .bind(&input.method)
        .bind(input.paid_on)
        .bind(actor)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record payment: {}", e)))?;

        let mut all = installments;
        all.push(input.amount);
        let total_paid =
            ledger::total_paid(current.receipt.amount_due, current.receipt.amount_paid, &all);
        let status =
            ledger::payment_status(current.receipt.amount_due, current.receipt.amount_paid, &all);

        audit::record(
            &mut tx,
            current.receipt.receipt_id,
            AuditAction::PartialPayment,
            actor,
            None,
            Some(json!({
                "amount": input.amount,
                "method": input.method,
                "total_paid": total_paid,
            })),
        )
        .await?;

        outbox::enqueue(
            &mut tx,
            OutboxKind::ReceiptUpdated,
            Some(current.receipt.receipt_id),
            Some(current.receipt.intern_id),
            &current.email,
        )
        .await?;

        tx.commit().await?;
        timer.observe_duration();

        PAYMENTS_TOTAL.with_label_values(&["accepted"]).inc();
        info!(
            receipt_id = %current.receipt.receipt_id,
            amount = %input.amount,
            status = status.as_str(),
            "Partial payment recorded"
        );

        Ok(PaymentOutcome {
            status,
            total_paid,
            remaining_balance: ledger::remaining_balance(
                current.receipt.amount_due,
                current.receipt.amount_paid,
                &all,
            ),
        })
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Fetch a receipt by id or number. Voided receipts ARE returned here;
    /// only listings exclude them.
    #[instrument(skip(self))]
    pub async fn get(&self, receipt_ref: &ReceiptRef) -> Result<Option<ReceiptDetail>, AppError> {
        let sql = format!(
            r#"
            SELECT {DETAIL_COLUMNS}
            FROM receipts r
            JOIN interns i ON i.intern_id = r.intern_id
            WHERE r.receipt_id = $1 OR r.receipt_number = $2
            "#
        );

        let (id, number) = split_ref(receipt_ref);
        let detail = sqlx::query_as::<_, ReceiptDetail>(&sql)
            .bind(id)
            .bind(number)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get receipt: {}", e)))?;

        Ok(detail)
    }

    /// Most recent active receipts. Voided receipts are implicitly excluded.
    #[instrument(skip(self))]
    pub async fn list(&self, limit: i64) -> Result<Vec<ReceiptSummary>, AppError> {
        let receipts = sqlx::query_as::<_, ReceiptSummary>(
            r#"
            SELECT r.receipt_id, r.receipt_number, i.first_name, i.last_name,
                   r.payment_type, r.payment_date, r.amount_due, r.amount_paid,
                   COALESCE((SELECT SUM(p.amount) FROM payments p WHERE p.receipt_id = r.receipt_id), 0) AS partial_total,
                   r.status
            FROM receipts r
            JOIN interns i ON i.intern_id = r.intern_id
            WHERE r.status != 'void'
            ORDER BY r.payment_date DESC, r.receipt_number DESC
            LIMIT $1
            "#,
        )
        .bind(limit.clamp(1, 500))
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list receipts: {}", e)))?;

        Ok(receipts)
    }

    /// Active receipts for one intern, newest first. Backs the intern
    /// payment-history view.
    #[instrument(skip(self))]
    pub async fn list_for_intern(&self, intern_id: Uuid) -> Result<Vec<ReceiptSummary>, AppError> {
        let receipts = sqlx::query_as::<_, ReceiptSummary>(
            r#"
            SELECT r.receipt_id, r.receipt_number, i.first_name, i.last_name,
                   r.payment_type, r.payment_date, r.amount_due, r.amount_paid,
                   COALESCE((SELECT SUM(p.amount) FROM payments p WHERE p.receipt_id = r.receipt_id), 0) AS partial_total,
                   r.status
            FROM receipts r
            JOIN interns i ON i.intern_id = r.intern_id
            WHERE r.intern_id = $1 AND r.status != 'void'
            ORDER BY r.payment_date DESC, r.receipt_number DESC
            "#,
        )
        .bind(intern_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list intern receipts: {}", e))
        })?;

        Ok(receipts)
    }

    /// Paged search over active receipts.
    #[instrument(skip(self, filter))]
    pub async fn search(
        &self,
        filter: &SearchReceiptsFilter,
    ) -> Result<(i64, Vec<ReceiptSummary>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["search_receipts"])
            .start_timer();

        let page_size = filter.page_size.clamp(1, 10_000);
        let offset = (filter.page.max(1) - 1) * page_size;
        let pattern = filter.query.as_ref().map(|q| format!("%{}%", q));
        let payment_type = filter.payment_type.map(|t| t.as_str().to_string());

        let predicate = r#"
            r.status != 'void'
            AND ($1::text IS NULL OR r.receipt_number ILIKE $1
                 OR i.first_name ILIKE $1 OR i.last_name ILIKE $1)
            AND ($2::date IS NULL OR r.payment_date >= $2)
            AND ($3::date IS NULL OR r.payment_date <= $3)
            AND ($4::varchar IS NULL OR r.payment_type = $4)
            AND ($5::numeric IS NULL OR r.amount_paid >= $5)
            AND ($6::numeric IS NULL OR r.amount_paid <= $6)
        "#;

        let total: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COUNT(*)
            FROM receipts r
            JOIN interns i ON i.intern_id = r.intern_id
            WHERE {predicate}
            "#
        ))
        .bind(&pattern)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(&payment_type)
        .bind(filter.min_amount)
        .bind(filter.max_amount)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Search count failed: {}", e)))?;

        let receipts = sqlx::query_as::<_, ReceiptSummary>(&format!(
            r#"
            SELECT r.receipt_id, r.receipt_number, i.first_name, i.last_name,
                   r.payment_type, r.payment_date, r.amount_due, r.amount_paid,
                   COALESCE((SELECT SUM(p.amount) FROM payments p WHERE p.receipt_id = r.receipt_id), 0) AS partial_total,
                   r.status
            FROM receipts r
            JOIN interns i ON i.intern_id = r.intern_id
            WHERE {predicate}
            ORDER BY r.payment_date DESC, r.receipt_number DESC
            LIMIT $7 OFFSET $8
            "#
        ))
        .bind(&pattern)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(&payment_type)
        .bind(filter.min_amount)
        .bind(filter.max_amount)
        .bind(page_size)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Search failed: {}", e)))?;

        timer.observe_duration();

        Ok((total, receipts))
    }

    /// Installment history, ordered by payment date for display.
    #[instrument(skip(self))]
    pub async fn payments(&self, receipt_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, receipt_id, amount, method, paid_on, recorded_by, recorded_utc, notes
            FROM payments
            WHERE receipt_id = $1
            ORDER BY paid_on, recorded_utc
            "#,
        )
        .bind(receipt_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load payments: {}", e)))?;

        Ok(payments)
    }

    /// Immutable audit history for a receipt.
    #[instrument(skip(self))]
    pub async fn audit_history(&self, receipt_id: Uuid) -> Result<Vec<AuditLogEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT audit_id, receipt_id, action, actor_id, old_values, new_values, created_utc
            FROM receipt_audit_logs
            WHERE receipt_id = $1
            ORDER BY created_utc
            "#,
        )
        .bind(receipt_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load audit history: {}", e))
        })?;

        Ok(entries)
    }
}

fn split_ref(receipt_ref: &ReceiptRef) -> (Option<Uuid>, String) {
    match receipt_ref {
        ReceiptRef::Id(id) => (Some(*id), String::new()),
        ReceiptRef::Number(number) => (None, number.clone()),
    }
}

/// Load a receipt (joined with its intern) and lock the row for the rest of
/// the transaction.
async fn load_detail_for_update(
    conn: &mut PgConnection,
    receipt_ref: &ReceiptRef,
) -> Result<Option<ReceiptDetail>, AppError> {
    let sql = format!(
        r#"
        SELECT {DETAIL_COLUMNS}
        FROM receipts r
        JOIN interns i ON i.intern_id = r.intern_id
        WHERE r.receipt_id = $1 OR r.receipt_number = $2
        FOR UPDATE OF r
        "#
    );

    let (id, number) = split_ref(receipt_ref);
    let detail = sqlx::query_as::<_, ReceiptDetail>(&sql)
        .bind(id)
        .bind(number)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load receipt: {}", e)))?;

    Ok(detail)
}

async fn load_installment_amounts(
    conn: &mut PgConnection,
    receipt_id: Uuid,
) -> Result<Vec<Decimal>, AppError> {
    let amounts: Vec<Decimal> =
        sqlx::query_scalar("SELECT amount FROM payments WHERE receipt_id = $1")
            .bind(receipt_id)
            .fetch_all(conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to load installments: {}", e))
            })?;

    Ok(amounts)
}
