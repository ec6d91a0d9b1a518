//! Audit trail for receipt mutations.
//!
//! One entry per accepted mutating operation, inserted on the SAME
//! transaction as the mutation it documents. If the transaction aborts no
//! entry exists; the log write is never retried independently.

use crate::error::AppError;
use crate::models::AuditAction;
use sqlx::PgConnection;
use uuid::Uuid;

pub async fn record(
    conn: &mut PgConnection,
    receipt_id: Uuid,
    action: AuditAction,
    actor_id: Uuid,
    old_values: Option<serde_json::Value>,
    new_values: Option<serde_json::Value>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO receipt_audit_logs (audit_id, receipt_id, action, actor_id, old_values, new_values)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(receipt_id)
    .bind(action.as_str())
    .bind(actor_id)
    .bind(old_values)
    .bind(new_values)
    .execute(conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to write audit entry: {}", e)))?;

    Ok(())
}
