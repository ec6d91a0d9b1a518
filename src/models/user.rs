//! Admin account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub permission: String,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

/// User projection safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SanitizedUser {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub permission: String,
    pub status: String,
}

impl From<User> for SanitizedUser {
    fn from(user: User) -> Self {
        SanitizedUser {
            user_id: user.user_id,
            email: user.email,
            full_name: user.full_name,
            permission: user.permission,
            status: user.status,
        }
    }
}
