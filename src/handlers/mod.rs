pub mod appointments;
pub mod catalog;
pub mod health;
pub mod payments;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::models::{Caller, Role};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route("/api/appointments/:id", get(appointments::get_appointment))
        .route(
            "/api/appointments/:id/assign",
            post(appointments::assign_employee),
        )
        .route(
            "/api/appointments/:id/status",
            post(appointments::update_status),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(appointments::cancel_appointment),
        )
        .route("/api/payments/verify", post(payments::verify_payment))
        .route(
            "/api/branches",
            get(catalog::list_branches).post(catalog::create_branch),
        )
        .route(
            "/api/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/api/services",
            get(catalog::list_services).post(catalog::create_service),
        )
        .route("/api/rooms", get(catalog::list_rooms).post(catalog::create_room))
        .route(
            "/api/employees",
            get(catalog::list_employees).post(catalog::create_employee),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Checks the shared bearer token and reads the identity forwarded by the
/// upstream auth gateway.
pub(crate) fn authenticate(headers: &HeaderMap, expected_token: &str) -> Result<Caller, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }

    let id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Unauthorized)?;
    let role = headers
        .get("x-actor-role")
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .ok_or(AppError::Unauthorized)?;

    Ok(Caller::new(id, role))
}
