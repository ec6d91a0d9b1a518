use crate::dtos::admins::{CreateAdminRequest, UpdateAdminStatusRequest};
use crate::dtos::auth::MessageResponse;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::utils::{hash_password, Password, ValidatedJson};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

fn require_superadmin(user: &CurrentUser) -> Result<(), AppError> {
    if user.is_superadmin() {
        Ok(())
    } else {
        Err(AppError::Unauthorized(anyhow::anyhow!(
            "Superadmin permission required"
        )))
    }
}

pub async fn list_admins(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    require_superadmin(&user)?;
    let admins = state.db.list_users().await?;
    Ok(Json(admins))
}

pub async fn create_admin(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_superadmin(&user)?;

    let permission = req.permission.as_deref().unwrap_or("admin");
    if permission != "admin" && permission != "superadmin" {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Permission must be admin or superadmin"
        )));
    }

    let hash = hash_password(&Password::new(req.password))?;
    let admin = state
        .db
        .create_user(&req.email, hash.as_str(), &req.full_name, permission)
        .await?;

    Ok((StatusCode::CREATED, Json(admin)))
}

pub async fn set_admin_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(admin_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAdminStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_superadmin(&user)?;

    if req.status != "active" && req.status != "disabled" {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Status must be active or disabled"
        )));
    }
    if admin_id == user.0.user_id {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "You cannot change your own status"
        )));
    }

    let updated = state.db.set_user_status(admin_id, &req.status).await?;
    if !updated {
        return Err(AppError::NotFound(anyhow::anyhow!("Admin not found")));
    }

    Ok(Json(MessageResponse {
        message: format!("Admin status set to {}", req.status),
    }))
}

pub async fn delete_admin(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(admin_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_superadmin(&user)?;

    if admin_id == user.0.user_id {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "You cannot delete your own account"
        )));
    }

    let deleted = state.db.delete_user(admin_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Admin not found")));
    }

    Ok(Json(MessageResponse {
        message: "Admin deleted".to_string(),
    }))
}
