use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::authenticate;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus, LedgerEntry};
use crate::services::booking::{self, BookingOutcome, BookingRequest};
use crate::services::lifecycle;
use crate::state::AppState;

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingOutcome>), AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    let now = Utc::now().naive_utc();

    let outcome = booking::create_booking(&state, &caller, &request, now).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

// GET /api/appointments
#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    if !caller.role.is_staff() {
        return Err(AppError::Forbidden("only staff may list appointments".to_string()));
    }

    let status_filter = match query.status.as_deref() {
        Some(s) => Some(
            AppointmentStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let appointments = {
        let db = state.db.lock().await;
        queries::list_appointments(&db, status_filter, limit)?
    };

    Ok(Json(appointments))
}

// GET /api/appointments/:id
#[derive(Serialize)]
pub struct AppointmentDetail {
    appointment: Appointment,
    ledger_entries: Vec<LedgerEntry>,
}

pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AppointmentDetail>, AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;

    let (appointment, ledger_entries) = {
        let db = state.db.lock().await;
        let appointment = queries::get_appointment(&db, &id)?
            .ok_or_else(|| AppError::NotFound("appointment not found".to_string()))?;
        let entries = queries::get_entries_for_appointment(&db, &id)?;
        (appointment, entries)
    };

    if !caller.role.is_staff() && caller.id != appointment.customer_id {
        return Err(AppError::NotFound("appointment not found".to_string()));
    }

    Ok(Json(AppointmentDetail {
        appointment,
        ledger_entries,
    }))
}

// POST /api/appointments/:id/assign
#[derive(Deserialize)]
pub struct AssignRequest {
    pub employee_id: String,
}

pub async fn assign_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Appointment>, AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    let appointment = lifecycle::assign_employee(&state, &caller, &id, &body.employee_id).await?;
    Ok(Json(appointment))
}

// POST /api/appointments/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: AppointmentStatus,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    let appointment = lifecycle::update_status(&state, &caller, &id, body.status).await?;
    Ok(Json(appointment))
}

// POST /api/appointments/:id/cancel
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    let appointment = lifecycle::cancel(&state, &caller, &id).await?;
    Ok(Json(appointment))
}
