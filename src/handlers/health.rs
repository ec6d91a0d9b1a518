use crate::error::AppError;
use crate::services::metrics;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.db.health_check().await?;
    Ok((StatusCode::OK, Json(json!({ "status": "healthy" }))))
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather(),
    )
}
