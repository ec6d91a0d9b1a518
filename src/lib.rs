pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::services::email::EmailProvider;
use crate::services::{Database, ReceiptService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub db: Database,
    pub receipts: ReceiptService,
    pub email: Arc<dyn EmailProvider>,
}

pub fn build_router(state: AppState) -> Router {
    // Everything below requires a valid session cookie.
    let protected = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/me/profile", put(handlers::auth::update_profile))
        .route("/auth/me/email", put(handlers::auth::update_email))
        .route("/auth/me/password", put(handlers::auth::change_password))
        .route(
            "/admins",
            get(handlers::admins::list_admins).post(handlers::admins::create_admin),
        )
        .route(
            "/admins/:admin_id/status",
            put(handlers::admins::set_admin_status),
        )
        .route("/admins/:admin_id", delete(handlers::admins::delete_admin))
        .route(
            "/interns",
            get(handlers::interns::list_interns).post(handlers::interns::register_intern),
        )
        .route("/interns/search", get(handlers::interns::search_interns))
        .route(
            "/interns/:intern_id",
            get(handlers::interns::get_intern).put(handlers::interns::update_intern),
        )
        .route(
            "/interns/:intern_id/receipts",
            get(handlers::interns::intern_receipts),
        )
        .route(
            "/receipts",
            get(handlers::receipts::list_receipts).post(handlers::receipts::create_receipt),
        )
        .route("/receipts/search", get(handlers::receipts::search_receipts))
        .route(
            "/receipts/:reference",
            get(handlers::receipts::get_receipt).put(handlers::receipts::update_receipt),
        )
        .route("/receipts/:reference/void", post(handlers::receipts::void_receipt))
        .route(
            "/receipts/:reference/payments",
            get(handlers::receipts::receipt_payments).post(handlers::receipts::add_payment),
        )
        .route(
            "/receipts/:reference/audit-log",
            get(handlers::receipts::receipt_audit_log),
        )
        .route("/receipts/:reference/pdf", get(handlers::receipts::receipt_pdf))
        .route(
            "/attendance",
            get(handlers::attendance::attendance_for_day)
                .post(handlers::attendance::mark_attendance),
        )
        .route(
            "/exports/interns.csv",
            get(handlers::exports::export_interns_csv),
        )
        .route(
            "/exports/receipts.csv",
            get(handlers::exports::export_receipts_csv),
        )
        .route(
            "/exports/attendance.xlsx",
            get(handlers::exports::export_attendance_xlsx),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/auth/login", post(handlers::auth::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
