use crate::error::AppError;
use crate::models::SanitizedUser;
use crate::AppState;
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session_token";

/// The authenticated admin, attached by [`session_auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SanitizedUser);

impl CurrentUser {
    pub fn is_superadmin(&self) -> bool {
        self.0.permission == "superadmin"
    }
}

/// Resolve the session cookie against the sessions table and attach the
/// admin to the request. Expired or unknown tokens are rejected before any
/// handler runs.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Not logged in")))?;

    let token = Uuid::parse_str(&token)
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid session token")))?;

    let user = state
        .db
        .find_session_user(token)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Session expired")))?;

    tracing::Span::current().record("user_id", tracing::field::display(user.user_id));

    request
        .extensions_mut()
        .insert(CurrentUser(SanitizedUser::from(user)));

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Not logged in")))
    }
}
