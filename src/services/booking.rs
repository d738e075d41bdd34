use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{queries, TransactionScope};
use crate::errors::AppError;
use crate::models::customer::CustomerDetails;
use crate::models::{
    Appointment, AppointmentStatus, Caller, Category, Customer, Employee, Interval, LedgerEntry,
    LedgerStatus, PaymentMethod, PaymentStatus, ResourceKind, Room,
};
use crate::services::conflict;
use crate::services::customers::resolve_customer;
use crate::services::payment::PaymentIntent;
use crate::state::AppState;

const APPOINTMENT_SEQUENCE: &str = "appointment";

/// Longest treatment a single appointment may block a room for.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service_id: String,
    pub room_type: Option<String>,
    pub start: NaiveDateTime,
    pub duration_minutes: Option<i64>,
    pub payment_method: PaymentMethod,
    pub price: i64,
    pub room_price: Option<i64>,
    pub total_price: i64,
    /// Present only when staff books on a customer's behalf.
    pub customer: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingOutcome {
    pub appointment: Appointment,
    pub eligible_employees: Vec<Employee>,
    pub gateway_reference: Option<PaymentIntent>,
}

/// Everything resolved inside the transaction before the payment branch.
struct PlannedBooking {
    appointment: Appointment,
    category: Category,
    room: Option<Room>,
}

/// Creates an appointment and its room reservation as one transaction.
///
/// Nothing is persisted unless every step succeeds, including opening the
/// gateway order for online payments. `now` is the reference for rejecting
/// past start times.
pub async fn create_booking(
    state: &Arc<AppState>,
    caller: &Caller,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> Result<BookingOutcome, AppError> {
    validate_request(caller, request)?;
    let now = now.trunc_subsecs(0);

    let scope = TransactionScope::begin(&state.db).await?;
    let planned = plan_booking(scope.conn(), caller, request, now)?;
    let mut appointment = planned.appointment;

    let gateway_reference = match appointment.payment_method {
        PaymentMethod::Online => {
            // The scope holds the only connection, so the gateway call is bounded.
            let timeout = Duration::from_millis(state.config.payment_timeout_ms);
            let intent = tokio::time::timeout(
                timeout,
                state.gateway.create_intent(
                    appointment.total_price,
                    &state.config.payment_currency,
                    &appointment.code,
                ),
            )
            .await
            .map_err(|_| {
                tracing::warn!(code = %appointment.code, timeout_ms = state.config.payment_timeout_ms, "payment intent timed out, rolling back booking");
                AppError::ExternalService("payment gateway timed out".to_string())
            })?
            .map_err(|e| {
                tracing::warn!(code = %appointment.code, error = %e, "payment intent failed, rolling back booking");
                AppError::ExternalService(e.to_string())
            })?;

            queries::set_gateway_order(scope.conn(), &appointment.id, &intent.order_id)?;
            appointment.gateway_order_id = Some(intent.order_id.clone());
            Some(intent)
        }
        PaymentMethod::Cash => None,
    };

    let eligible_employees =
        eligible_employees(scope.conn(), &planned.category, planned.room.as_ref())?;

    scope.commit()?;

    tracing::info!(
        appointment_id = %appointment.id,
        code = %appointment.code,
        room_id = ?appointment.room_id,
        payment_method = appointment.payment_method.as_str(),
        "booking committed"
    );

    Ok(BookingOutcome {
        appointment,
        eligible_employees,
        gateway_reference,
    })
}

fn validate_request(caller: &Caller, request: &BookingRequest) -> Result<(), AppError> {
    if request.customer.is_some() && !caller.role.is_staff() {
        return Err(AppError::Forbidden(
            "only staff may book on behalf of a customer".to_string(),
        ));
    }

    if request.service_id.trim().is_empty() {
        return Err(AppError::Validation("service_id is required".to_string()));
    }

    if let Some(minutes) = request.duration_minutes {
        if minutes <= 0 {
            return Err(AppError::Validation(
                "duration_minutes must be positive".to_string(),
            ));
        }
        if minutes > MAX_DURATION_MINUTES {
            return Err(AppError::Validation(format!(
                "duration_minutes must not exceed {MAX_DURATION_MINUTES}"
            )));
        }
    }

    if request.price < 0 || request.total_price < 0 || request.room_price.is_some_and(|p| p < 0) {
        return Err(AppError::Validation("prices must not be negative".to_string()));
    }

    if let Some(details) = &request.customer {
        if details.name.trim().is_empty() || details.phone.trim().is_empty() {
            return Err(AppError::Validation(
                "customer name and phone are required".to_string(),
            ));
        }
    }

    Ok(())
}

/// Resolves the customer, service and room, then writes the appointment and
/// room ledger entry. Runs entirely inside the caller's transaction.
fn plan_booking(
    conn: &Connection,
    caller: &Caller,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> Result<PlannedBooking, AppError> {
    let customer = booking_customer(conn, caller, request, now)?;

    let service = queries::get_service(conn, request.service_id.trim())?
        .ok_or_else(|| AppError::Validation(format!("unknown service: {}", request.service_id)))?;
    let category = queries::get_category(conn, &service.category_id)?.ok_or_else(|| {
        anyhow::anyhow!("service {} references missing category {}", service.id, service.category_id)
    })?;

    // Stored timestamps carry whole seconds only.
    let start = request.start.trunc_subsecs(0);
    if start < now {
        return Err(AppError::Validation("start time is in the past".to_string()));
    }

    let duration = request.duration_minutes.unwrap_or(service.duration_minutes);
    if duration <= 0 || duration > MAX_DURATION_MINUTES {
        return Err(AppError::Validation(format!(
            "duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
        )));
    }
    let interval = Interval::starting_at(start, duration)
        .ok_or_else(|| AppError::Validation("duration_minutes out of range".to_string()))?;

    let room = if category.requires_physical_resource {
        let room_type = request
            .room_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Validation(format!("room_type is required for {} services", category.name))
            })?;
        Some(find_free_room(conn, room_type, &interval)?)
    } else {
        None
    };

    let room_price = match &room {
        Some(room) => request.room_price.unwrap_or(room.price),
        None => 0,
    };

    let sequence = queries::next_sequence(conn, APPOINTMENT_SEQUENCE)?;
    let appointment = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        code: format!("APT-{sequence:06}"),
        customer_id: customer.id,
        service_id: service.id,
        room_id: room.as_ref().map(|r| r.id.clone()),
        employee_id: None,
        start_at: interval.start,
        end_at: interval.end,
        status: AppointmentStatus::Pending,
        payment_status: PaymentStatus::initial_for(request.payment_method),
        payment_method: request.payment_method,
        price: request.price,
        room_price,
        total_price: request.total_price,
        gateway_order_id: None,
        gateway_payment_id: None,
        created_by: caller.id.clone(),
        created_at: now,
        updated_at: now,
    };
    queries::create_appointment(conn, &appointment)?;

    if let Some(room) = &room {
        queries::insert_ledger_entry(
            conn,
            &LedgerEntry {
                id: uuid::Uuid::new_v4().to_string(),
                resource_kind: ResourceKind::Room,
                resource_id: room.id.clone(),
                interval,
                status: LedgerStatus::Booked,
                appointment_id: appointment.id.clone(),
                created_at: now,
                updated_at: now,
            },
        )?;
    }

    Ok(PlannedBooking {
        appointment,
        category,
        room,
    })
}

fn booking_customer(
    conn: &Connection,
    caller: &Caller,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> Result<Customer, AppError> {
    match &request.customer {
        Some(details) => Ok(resolve_customer(conn, details, now)?),
        None => queries::get_customer(conn, &caller.id)?.ok_or_else(|| {
            AppError::Validation(
                "no customer record for the caller; supply customer details".to_string(),
            )
        }),
    }
}

// First free room wins, in catalog order.
fn find_free_room(conn: &Connection, room_type: &str, interval: &Interval) -> Result<Room, AppError> {
    for room in queries::find_available_rooms_by_type(conn, room_type)? {
        if conflict::is_free(conn, ResourceKind::Room, &room.id, interval)? {
            return Ok(room);
        }
    }

    tracing::info!(room_type = %room_type, start = %interval.start, "no free room");
    Err(AppError::Conflict(format!(
        "no {room_type} room is free for the requested time"
    )))
}

/// Employees whose skill matches the category and, for room bookings, who
/// work at the room's branch. Non-room services carry no branch constraint.
pub fn eligible_employees(
    conn: &Connection,
    category: &Category,
    room: Option<&Room>,
) -> anyhow::Result<Vec<Employee>> {
    Ok(queries::find_employees_by_role(conn, &category.required_role)?
        .into_iter()
        .filter(|employee| employee.works_at(room))
        .collect())
}
