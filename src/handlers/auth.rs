use crate::dtos::auth::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, UpdateEmailRequest,
    UpdateProfileRequest,
};
use crate::error::AppError;
use crate::middleware::{CurrentUser, SESSION_COOKIE};
use crate::models::SanitizedUser;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString, ValidatedJson};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

fn session_cookie(token: Uuid, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(ttl_hours))
        .build()
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid credentials")))?;

    if user.status != "active" {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Account is disabled"
        )));
    }

    verify_password(
        &Password::new(req.password),
        &PasswordHashString::new(user.password_hash.clone()),
    )
    .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid credentials")))?;

    let session = state
        .db
        .create_session(user.user_id, state.config.session.ttl_hours)
        .await?;

    let jar = jar.add(session_cookie(
        session.token,
        state.config.session.ttl_hours,
    ));

    tracing::info!(user_id = %user.user_id, "Admin logged in");

    Ok((
        jar,
        Json(LoginResponse {
            user: SanitizedUser::from(user),
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(token) = Uuid::parse_str(cookie.value()) {
            state.db.delete_session(token).await?;
        }
    }

    let jar = jar.remove(Cookie::from(SESSION_COOKIE));

    Ok((
        jar,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}

pub async fn me(user: CurrentUser) -> impl IntoResponse {
    Json(user.0)
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .update_user_name(user.0.user_id, &req.full_name)
        .await?;

    Ok(Json(MessageResponse {
        message: "Profile updated".to_string(),
    }))
}

pub async fn update_email(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = state
        .db
        .get_user(user.0.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account not found")))?;

    verify_password(
        &Password::new(req.password),
        &PasswordHashString::new(account.password_hash),
    )
    .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Password is incorrect")))?;

    state.db.update_user_email(user.0.user_id, &req.email).await?;

    Ok(Json(MessageResponse {
        message: "Email updated".to_string(),
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    jar: CookieJar,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = state
        .db
        .get_user(user.0.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account not found")))?;

    verify_password(
        &Password::new(req.current_password),
        &PasswordHashString::new(account.password_hash),
    )
    .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Current password is incorrect")))?;

    let new_hash = hash_password(&Password::new(req.new_password))?;
    state
        .db
        .update_user_password(user.0.user_id, new_hash.as_str())
        .await?;

    // Password changes invalidate every other session for the account.
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(token) = Uuid::parse_str(cookie.value()) {
            state.db.rotate_sessions(user.0.user_id, token).await?;
        }
    }

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password changed".to_string(),
        }),
    ))
}
