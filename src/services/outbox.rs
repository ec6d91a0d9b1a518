//! Durable document outbox.
//!
//! Mutations enqueue a row in the same transaction as the ledger write; a
//! background worker claims due rows, renders the PDF, and hands it to the
//! email provider. Failed deliveries retry with exponential backoff until
//! the attempt limit, then park as `failed` for operator attention. A
//! crashed process never loses a pending document.

use crate::config::{OutboxConfig, ReceiptConfig};
use crate::error::AppError;
use crate::models::{OutboxEntry, OutboxKind, OutboxStatus};
use crate::services::email::{EmailMessage, EmailProvider, PdfAttachment};
use crate::services::metrics::OUTBOX_DELIVERIES_TOTAL;
use crate::services::receipts::{ReceiptRef, ReceiptService};
use crate::services::{documents, Database};
use sqlx::PgConnection;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const CLAIM_BATCH: i64 = 10;
const MAX_BACKOFF_SECS: i64 = 3600;
// A claimed entry is invisible to other workers for this long; if the
// process dies mid-delivery the entry comes due again on its own.
const CLAIM_LEASE_SECS: i64 = 300;

/// Insert a pending outbox row. Must run on the caller's transaction so the
/// side effect commits atomically with the mutation that caused it.
pub async fn enqueue(
    conn: &mut PgConnection,
    kind: OutboxKind,
    receipt_id: Option<Uuid>,
    intern_id: Option<Uuid>,
    recipient: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO document_outbox (outbox_id, receipt_id, intern_id, kind, recipient)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(receipt_id)
    .bind(intern_id)
    .bind(kind.as_str())
    .bind(recipient)
    .execute(conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to enqueue document: {}", e)))?;

    Ok(())
}

pub struct OutboxWorker {
    db: Database,
    receipts: ReceiptService,
    provider: Arc<dyn EmailProvider>,
    config: OutboxConfig,
    receipt_config: ReceiptConfig,
}

impl OutboxWorker {
    pub fn new(
        db: Database,
        receipts: ReceiptService,
        provider: Arc<dyn EmailProvider>,
        config: OutboxConfig,
        receipt_config: ReceiptConfig,
    ) -> Self {
        Self {
            db,
            receipts,
            provider,
            config,
            receipt_config,
        }
    }

    /// Poll loop. Runs until the process shuts down.
    pub async fn run(self) {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.config.poll_interval_secs));
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            "Outbox worker started"
        );
        loop {
            interval.tick().await;
            if let Err(e) = self.drain_due().await {
                error!(error = %e, "Outbox poll failed");
            }
        }
    }

    /// Process every currently-due entry. Each entry is claimed with a row
    /// lock (SKIP LOCKED) so multiple workers never double-send.
    pub async fn drain_due(&self) -> Result<(), AppError> {
        loop {
            let processed = self.process_batch().await?;
            if processed == 0 {
                return Ok(());
            }
        }
    }

    /// Claim a batch and deliver it. The claim commits immediately (the
    /// lease keeps other workers off the entries), so no row lock or pool
    /// connection spans the SMTP sends; each outcome is recorded in its own
    /// short statement.
    #[instrument(skip(self))]
    async fn process_batch(&self) -> Result<usize, AppError> {
        let entries = self.claim_batch().await?;
        let claimed = entries.len();

        for entry in entries {
            match self.deliver(&entry).await {
                Ok(()) => {
                    self.mark_sent(&entry).await?;
                    OUTBOX_DELIVERIES_TOTAL.with_label_values(&["sent"]).inc();
                    info!(outbox_id = %entry.outbox_id, kind = %entry.kind, "Document delivered");
                }
                Err(e) => {
                    let attempts = entry.attempts + 1;
                    if attempts >= self.config.max_attempts {
                        self.mark_failed(&entry, attempts, &e).await?;
                        OUTBOX_DELIVERIES_TOTAL.with_label_values(&["failed"]).inc();
                        error!(outbox_id = %entry.outbox_id, attempts, error = %e, "Document delivery gave up");
                    } else {
                        let backoff = backoff_secs(attempts, self.config.poll_interval_secs as i64);
                        self.mark_retry(&entry, attempts, backoff, &e).await?;
                        OUTBOX_DELIVERIES_TOTAL.with_label_values(&["retry"]).inc();
                        warn!(outbox_id = %entry.outbox_id, attempts, backoff_secs = backoff, error = %e, "Document delivery will retry");
                    }
                }
            }
        }

        Ok(claimed)
    }

    /// One atomic UPDATE: pick due pending entries with SKIP LOCKED and push
    /// their next_attempt_utc past the lease so concurrent workers skip them.
    async fn claim_batch(&self) -> Result<Vec<OutboxEntry>, AppError> {
        let entries = sqlx::query_as::<_, OutboxEntry>(
            r#"
            UPDATE document_outbox
            SET next_attempt_utc = NOW() + make_interval(secs => $2)
            WHERE outbox_id IN (
                SELECT outbox_id
                FROM document_outbox
                WHERE status = 'pending' AND next_attempt_utc <= NOW()
                ORDER BY created_utc
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING outbox_id, receipt_id, intern_id, kind, recipient, status,
                      attempts, next_attempt_utc, last_error, created_utc, sent_utc
            "#,
        )
        .bind(CLAIM_BATCH)
        .bind(CLAIM_LEASE_SECS as f64)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to claim outbox: {}", e)))?;

        Ok(entries)
    }

    async fn mark_sent(&self, entry: &OutboxEntry) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE document_outbox SET status = $2, sent_utc = NOW(), last_error = NULL WHERE outbox_id = $1",
        )
        .bind(entry.outbox_id)
        .bind(OutboxStatus::Sent.as_str())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        entry: &OutboxEntry,
        attempts: i32,
        error: &AppError,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE document_outbox SET status = $4, attempts = $2, last_error = $3 WHERE outbox_id = $1",
        )
        .bind(entry.outbox_id)
        .bind(attempts)
        .bind(error.to_string())
        .bind(OutboxStatus::Failed.as_str())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn mark_retry(
        &self,
        entry: &OutboxEntry,
        attempts: i32,
        backoff: i64,
        error: &AppError,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE document_outbox SET attempts = $2, last_error = $3, next_attempt_utc = NOW() + make_interval(secs => $4) WHERE outbox_id = $1",
        )
        .bind(entry.outbox_id)
        .bind(attempts)
        .bind(error.to_string())
        .bind(backoff as f64)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn deliver(&self, entry: &OutboxEntry) -> Result<(), AppError> {
        let email = match OutboxKind::from_string(&entry.kind) {
            OutboxKind::ReceiptCreated | OutboxKind::ReceiptUpdated => {
                let receipt_id = entry.receipt_id.ok_or_else(|| {
                    AppError::InternalError(anyhow::anyhow!("Outbox entry missing receipt_id"))
                })?;
                let detail = self
                    .receipts
                    .get(&ReceiptRef::Id(receipt_id))
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalError(anyhow::anyhow!("Outbox receipt no longer exists"))
                    })?;
                let payments = self.receipts.payments(receipt_id).await?;
                let pdf = documents::render_receipt(&detail, &payments, &self.receipt_config)?;

                let created = OutboxKind::from_string(&entry.kind) == OutboxKind::ReceiptCreated;
                EmailMessage {
                    to: entry.recipient.clone(),
                    subject: if created {
                        format!("Receipt {}", detail.receipt.receipt_number)
                    } else {
                        format!("Updated receipt {}", detail.receipt.receipt_number)
                    },
                    body_text: format!(
                        "Dear {} {},\n\nPlease find your {} receipt {} attached.\n\n{}",
                        detail.first_name,
                        detail.last_name,
                        if created { "payment" } else { "updated payment" },
                        detail.receipt.receipt_number,
                        self.receipt_config.organization_name,
                    ),
                    attachment: Some(PdfAttachment {
                        filename: format!(
                            "{}.pdf",
                            detail.receipt.receipt_number.replace('/', "-")
                        ),
                        bytes: pdf,
                    }),
                }
            }
            OutboxKind::InternWelcome => {
                let intern_id = entry.intern_id.ok_or_else(|| {
                    AppError::InternalError(anyhow::anyhow!("Outbox entry missing intern_id"))
                })?;
                let intern = self.db.get_intern(intern_id).await?.ok_or_else(|| {
                    AppError::InternalError(anyhow::anyhow!("Outbox intern no longer exists"))
                })?;
                let pdf = documents::render_welcome_letter(
                    &intern.first_name,
                    &intern.last_name,
                    &intern.department,
                    &self.receipt_config,
                )?;

                EmailMessage {
                    to: entry.recipient.clone(),
                    subject: format!(
                        "Welcome to {}",
                        self.receipt_config.organization_name
                    ),
                    body_text: format!(
                        "Dear {} {},\n\nWelcome to the internship program. Your welcome letter is attached.\n\n{}",
                        intern.first_name, intern.last_name, self.receipt_config.organization_name,
                    ),
                    attachment: Some(PdfAttachment {
                        filename: "welcome-letter.pdf".to_string(),
                        bytes: pdf,
                    }),
                }
            }
        };

        self.provider.send(&email).await
    }
}

fn backoff_secs(attempts: i32, base_secs: i64) -> i64 {
    let factor = 1i64 << attempts.clamp(0, 10) as u32;
    (base_secs.max(1) * factor).min(MAX_BACKOFF_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_secs(1, 30), 60);
        assert_eq!(backoff_secs(2, 30), 120);
        assert_eq!(backoff_secs(3, 30), 240);
        assert_eq!(backoff_secs(10, 30), MAX_BACKOFF_SECS);
    }

    #[test]
    fn backoff_handles_zero_base() {
        assert_eq!(backoff_secs(1, 0), 2);
    }
}
