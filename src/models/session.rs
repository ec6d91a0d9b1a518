use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Server-side session row backing the admin session cookie.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: Uuid,
    pub user_id: Uuid,
    pub created_utc: DateTime<Utc>,
    pub expires_utc: DateTime<Utc>,
}
