use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;

use crate::db::{queries, TransactionScope};
use crate::errors::AppError;
use crate::models::{
    Appointment, AppointmentStatus, Caller, Customer, LedgerEntry, LedgerStatus, ResourceKind,
};
use crate::services::conflict;
use crate::state::AppState;

/// Attaches an employee to a pending appointment and confirms it.
///
/// The employee must work at the room's branch (when a room is attached),
/// carry the category's required role, and be free for the whole interval.
pub async fn assign_employee(
    state: &Arc<AppState>,
    caller: &Caller,
    appointment_id: &str,
    employee_id: &str,
) -> Result<Appointment, AppError> {
    if !caller.role.is_staff() {
        return Err(AppError::Forbidden(
            "only staff may assign employees".to_string(),
        ));
    }

    let scope = TransactionScope::begin(&state.db).await?;
    let (updated, notice) = apply_assignment(scope.conn(), appointment_id, employee_id)?;
    scope.commit()?;

    tracing::info!(
        appointment_id = %updated.id,
        employee_id = %employee_id,
        "employee assigned, appointment confirmed"
    );

    if let Some(customer) = notice {
        notify_confirmed(state, &customer, &updated).await;
    }

    Ok(updated)
}

fn apply_assignment(
    conn: &Connection,
    appointment_id: &str,
    employee_id: &str,
) -> Result<(Appointment, Option<Customer>), AppError> {
    let appt = load_appointment(conn, appointment_id)?;
    if appt.status != AppointmentStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "cannot assign an employee to a {} appointment",
            appt.status.as_str()
        )));
    }

    let employee = queries::get_employee(conn, employee_id)?
        .ok_or_else(|| AppError::NotFound(format!("employee {employee_id} not found")))?;
    let service = queries::get_service(conn, &appt.service_id)?
        .ok_or_else(|| anyhow::anyhow!("appointment {} references missing service", appt.id))?;
    let category = queries::get_category(conn, &service.category_id)?
        .ok_or_else(|| anyhow::anyhow!("service {} references missing category", service.id))?;
    let room = match &appt.room_id {
        Some(room_id) => Some(
            queries::get_room(conn, room_id)?
                .ok_or_else(|| anyhow::anyhow!("appointment {} references missing room", appt.id))?,
        ),
        None => None,
    };

    if !employee.works_at(room.as_ref()) {
        return Err(AppError::Validation(
            "employee branch does not match the room's branch".to_string(),
        ));
    }

    if !employee.can_perform(&category) {
        return Err(AppError::Validation(format!(
            "employee role '{}' does not match required role '{}'",
            employee.role, category.required_role
        )));
    }

    let interval = appt.interval();
    if !conflict::is_free(conn, ResourceKind::Employee, &employee.id, &interval)? {
        return Err(AppError::Conflict(format!(
            "{} is already booked for this time",
            employee.name
        )));
    }

    if !queries::attach_employee(conn, &appt.id, &employee.id)? {
        return Err(AppError::InvalidTransition(
            "appointment is no longer pending".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    queries::insert_ledger_entry(
        conn,
        &LedgerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            resource_kind: ResourceKind::Employee,
            resource_id: employee.id.clone(),
            interval,
            status: LedgerStatus::Booked,
            appointment_id: appt.id.clone(),
            created_at: now,
            updated_at: now,
        },
    )?;

    let notice = confirmation_recipient(conn, &appt)?;
    let updated = load_appointment(conn, &appt.id)?;
    Ok((updated, notice))
}

/// Applies an operator-driven transition from the allowed-transition table.
///
/// Cancelling releases every ledger entry the appointment holds. The
/// `pending -> confirmed` edge requires an attached employee and sends the
/// customer confirmation exactly once.
pub async fn update_status(
    state: &Arc<AppState>,
    caller: &Caller,
    appointment_id: &str,
    next: AppointmentStatus,
) -> Result<Appointment, AppError> {
    let scope = TransactionScope::begin(&state.db).await?;
    let (previous, updated, notice) = apply_transition(scope.conn(), caller, appointment_id, next)?;
    scope.commit()?;

    tracing::info!(
        appointment_id = %updated.id,
        from = previous.as_str(),
        to = next.as_str(),
        "appointment status updated"
    );

    if let Some(customer) = notice {
        notify_confirmed(state, &customer, &updated).await;
    }

    Ok(updated)
}

fn apply_transition(
    conn: &Connection,
    caller: &Caller,
    appointment_id: &str,
    next: AppointmentStatus,
) -> Result<(AppointmentStatus, Appointment, Option<Customer>), AppError> {
    let appt = load_appointment(conn, appointment_id)?;
    authorize_transition(caller, &appt, next)?;

    if !appt.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition(format!(
            "cannot move appointment from {} to {}",
            appt.status.as_str(),
            next.as_str()
        )));
    }

    let confirming = appt.status == AppointmentStatus::Pending && next == AppointmentStatus::Confirmed;
    if confirming && appt.employee_id.is_none() {
        return Err(AppError::InvalidTransition(
            "assign an employee before confirming".to_string(),
        ));
    }

    queries::update_appointment_status(conn, &appt.id, next)?;

    if next == AppointmentStatus::Cancelled {
        let released = queries::release_entries_for_appointment(conn, &appt.id)?;
        tracing::info!(appointment_id = %appt.id, released, "released ledger entries");
    }

    let notice = if confirming {
        confirmation_recipient(conn, &appt)?
    } else {
        None
    };
    let updated = load_appointment(conn, &appt.id)?;
    Ok((appt.status, updated, notice))
}

pub async fn complete(
    state: &Arc<AppState>,
    caller: &Caller,
    appointment_id: &str,
) -> Result<Appointment, AppError> {
    update_status(state, caller, appointment_id, AppointmentStatus::Completed).await
}

pub async fn cancel(
    state: &Arc<AppState>,
    caller: &Caller,
    appointment_id: &str,
) -> Result<Appointment, AppError> {
    update_status(state, caller, appointment_id, AppointmentStatus::Cancelled).await
}

// Staff drive every transition; a customer may only cancel their own booking.
fn authorize_transition(
    caller: &Caller,
    appt: &Appointment,
    next: AppointmentStatus,
) -> Result<(), AppError> {
    if caller.role.is_staff() {
        return Ok(());
    }
    if next == AppointmentStatus::Cancelled && caller.id == appt.customer_id {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "not allowed to mark appointment {}",
        next.as_str()
    )))
}

fn load_appointment(conn: &Connection, id: &str) -> Result<Appointment, AppError> {
    queries::get_appointment(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {id} not found")))
}

/// Claims the one-shot confirmation notice inside the transaction and returns
/// the customer to notify, or `None` if it was already sent.
fn confirmation_recipient(
    conn: &Connection,
    appt: &Appointment,
) -> Result<Option<Customer>, AppError> {
    if !queries::claim_confirmation_notice(conn, &appt.id)? {
        return Ok(None);
    }
    Ok(queries::get_customer(conn, &appt.customer_id)?)
}

// Fire-and-forget: delivery failures never undo the committed transition.
async fn notify_confirmed(state: &Arc<AppState>, customer: &Customer, appt: &Appointment) {
    let body = format!(
        "Hi {}, your appointment {} on {} is confirmed.",
        customer.name,
        appt.code,
        appt.start_at.format("%b %-d at %H:%M")
    );

    if let Err(e) = state.messaging.send_message(&customer.phone, &body).await {
        tracing::error!(
            appointment_id = %appt.id,
            error = %e,
            "failed to send confirmation notice"
        );
    }
}
