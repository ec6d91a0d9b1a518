use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, message = "Name is required"))]
    pub full_name: String,

    /// "admin" or "superadmin"; defaults to "admin".
    pub permission: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAdminStatusRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}
