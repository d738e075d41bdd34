use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Appointment, AppointmentStatus, Branch, Category, Customer, Employee, Interval, LedgerEntry,
    LedgerStatus, PaymentMethod, PaymentStatus, ResourceKind, Room, Service,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).with_context(|| format!("invalid timestamp: {s}"))
}

fn now_ts() -> String {
    format_ts(&Utc::now().naive_utc())
}

// ── Customers ──

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, password_hash, created_at";

pub fn create_customer(conn: &Connection, customer: &Customer) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO customers (id, name, phone, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            customer.id,
            customer.name,
            customer.phone,
            customer.email,
            customer.password_hash,
            format_ts(&customer.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_customer(conn: &Connection, id: &str) -> anyhow::Result<Option<Customer>> {
    query_customer(conn, "id", id)
}

pub fn find_customer_by_phone(conn: &Connection, phone: &str) -> anyhow::Result<Option<Customer>> {
    query_customer(conn, "phone", phone)
}

pub fn find_customer_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<Customer>> {
    query_customer(conn, "email", email)
}

fn query_customer(conn: &Connection, column: &str, value: &str) -> anyhow::Result<Option<Customer>> {
    let sql = format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE {column} = ?1 ORDER BY created_at ASC LIMIT 1"
    );
    let row = conn
        .query_row(&sql, params![value], |row| Ok(parse_customer_row(row)))
        .optional()?;
    row.transpose()
}

fn parse_customer_row(row: &rusqlite::Row) -> anyhow::Result<Customer> {
    let created_at: String = row.get(5)?;
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: parse_ts(&created_at)?,
    })
}

// ── Catalog ──

pub fn create_branch(conn: &Connection, branch: &Branch) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO branches (id, name) VALUES (?1, ?2)",
        params![branch.id, branch.name],
    )?;
    Ok(())
}

pub fn get_branch(conn: &Connection, id: &str) -> anyhow::Result<Option<Branch>> {
    let branch = conn
        .query_row(
            "SELECT id, name FROM branches WHERE id = ?1",
            params![id],
            |row| {
                Ok(Branch {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(branch)
}

pub fn list_branches(conn: &Connection) -> anyhow::Result<Vec<Branch>> {
    let mut stmt = conn.prepare("SELECT id, name FROM branches ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Branch {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut branches = vec![];
    for row in rows {
        branches.push(row?);
    }
    Ok(branches)
}

pub fn create_category(conn: &Connection, category: &Category) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO categories (id, name, requires_physical_resource, required_role)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            category.id,
            category.name,
            category.requires_physical_resource as i32,
            category.required_role,
        ],
    )?;
    Ok(())
}

pub fn get_category(conn: &Connection, id: &str) -> anyhow::Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name, requires_physical_resource, required_role FROM categories WHERE id = ?1",
            params![id],
            parse_category_row,
        )
        .optional()?;
    Ok(category)
}

pub fn list_categories(conn: &Connection) -> anyhow::Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, requires_physical_resource, required_role FROM categories ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], parse_category_row)?;

    let mut categories = vec![];
    for row in rows {
        categories.push(row?);
    }
    Ok(categories)
}

fn parse_category_row(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        requires_physical_resource: row.get::<_, i32>(2)? != 0,
        required_role: row.get(3)?,
    })
}

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, category_id, duration_minutes, price)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            service.id,
            service.name,
            service.category_id,
            service.duration_minutes,
            service.price,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT id, name, category_id, duration_minutes, price FROM services WHERE id = ?1",
            params![id],
            parse_service_row,
        )
        .optional()?;
    Ok(service)
}

pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category_id, duration_minutes, price FROM services ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        duration_minutes: row.get(3)?,
        price: row.get(4)?,
    })
}

const ROOM_COLUMNS: &str = "id, name, room_type, branch_id, capacity, price, is_available";

pub fn create_room(conn: &Connection, room: &Room) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO rooms (id, name, room_type, branch_id, capacity, price, is_available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            room.id,
            room.name,
            room.room_type,
            room.branch_id,
            room.capacity,
            room.price,
            room.is_available as i32,
        ],
    )?;
    Ok(())
}

pub fn get_room(conn: &Connection, id: &str) -> anyhow::Result<Option<Room>> {
    let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1");
    let room = conn.query_row(&sql, params![id], parse_room_row).optional()?;
    Ok(room)
}

pub fn list_rooms(conn: &Connection) -> anyhow::Result<Vec<Room>> {
    let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms ORDER BY rowid ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], parse_room_row)?;

    let mut rooms = vec![];
    for row in rows {
        rooms.push(row?);
    }
    Ok(rooms)
}

/// Generally-available rooms of a type, in catalog insertion order.
pub fn find_available_rooms_by_type(conn: &Connection, room_type: &str) -> anyhow::Result<Vec<Room>> {
    let sql = format!(
        "SELECT {ROOM_COLUMNS} FROM rooms WHERE room_type = ?1 AND is_available = 1 ORDER BY rowid ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![room_type], parse_room_row)?;

    let mut rooms = vec![];
    for row in rows {
        rooms.push(row?);
    }
    Ok(rooms)
}

fn parse_room_row(row: &rusqlite::Row) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        name: row.get(1)?,
        room_type: row.get(2)?,
        branch_id: row.get(3)?,
        capacity: row.get(4)?,
        price: row.get(5)?,
        is_available: row.get::<_, i32>(6)? != 0,
    })
}

pub fn create_employee(conn: &Connection, employee: &Employee) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO employees (id, name, phone, role, branch_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            employee.id,
            employee.name,
            employee.phone,
            employee.role,
            employee.branch_id,
        ],
    )?;
    Ok(())
}

pub fn get_employee(conn: &Connection, id: &str) -> anyhow::Result<Option<Employee>> {
    let employee = conn
        .query_row(
            "SELECT id, name, phone, role, branch_id FROM employees WHERE id = ?1",
            params![id],
            parse_employee_row,
        )
        .optional()?;
    Ok(employee)
}

pub fn list_employees(conn: &Connection) -> anyhow::Result<Vec<Employee>> {
    let mut stmt =
        conn.prepare("SELECT id, name, phone, role, branch_id FROM employees ORDER BY rowid ASC")?;
    let rows = stmt.query_map([], parse_employee_row)?;

    let mut employees = vec![];
    for row in rows {
        employees.push(row?);
    }
    Ok(employees)
}

pub fn find_employees_by_role(conn: &Connection, role: &str) -> anyhow::Result<Vec<Employee>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, phone, role, branch_id FROM employees
         WHERE role = ?1 ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map(params![role], parse_employee_row)?;

    let mut employees = vec![];
    for row in rows {
        employees.push(row?);
    }
    Ok(employees)
}

fn parse_employee_row(row: &rusqlite::Row) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        role: row.get(3)?,
        branch_id: row.get(4)?,
    })
}

// ── Appointments ──

const APPOINTMENT_COLUMNS: &str = "id, code, customer_id, service_id, room_id, employee_id, start_at, end_at, \
     status, payment_status, payment_method, price, room_price, total_price, gateway_order_id, \
     gateway_payment_id, created_by, created_at, updated_at";

pub fn create_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, code, customer_id, service_id, room_id, employee_id, start_at, end_at,
            status, payment_status, payment_method, price, room_price, total_price, gateway_order_id,
            gateway_payment_id, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            appt.id,
            appt.code,
            appt.customer_id,
            appt.service_id,
            appt.room_id,
            appt.employee_id,
            format_ts(&appt.start_at),
            format_ts(&appt.end_at),
            appt.status.as_str(),
            appt.payment_status.as_str(),
            appt.payment_method.as_str(),
            appt.price,
            appt.room_price,
            appt.total_price,
            appt.gateway_order_id,
            appt.gateway_payment_id,
            appt.created_by,
            format_ts(&appt.created_at),
            format_ts(&appt.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_appointment_row(row)))
        .optional()?;
    row.transpose()
}

pub fn list_appointments(
    conn: &Connection,
    status_filter: Option<AppointmentStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let mut appointments = vec![];
    match status_filter {
        Some(status) => {
            let sql = format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE status = ?1 ORDER BY start_at DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status.as_str(), limit], |row| {
                Ok(parse_appointment_row(row))
            })?;
            for row in rows {
                appointments.push(row??);
            }
        }
        None => {
            let sql = format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY start_at DESC LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], |row| Ok(parse_appointment_row(row)))?;
            for row in rows {
                appointments.push(row??);
            }
        }
    }
    Ok(appointments)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_ts(), id],
    )?;
    Ok(count > 0)
}

/// Attaches the employee and confirms in one statement, guarded on `pending`.
pub fn attach_employee(conn: &Connection, id: &str, employee_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET employee_id = ?1, status = 'confirmed', updated_at = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![employee_id, now_ts(), id],
    )?;
    Ok(count > 0)
}

pub fn set_gateway_order(conn: &Connection, id: &str, order_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE appointments SET gateway_order_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![order_id, now_ts(), id],
    )?;
    Ok(())
}

pub fn mark_paid(conn: &Connection, id: &str, payment_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET payment_status = ?1, gateway_payment_id = ?2, updated_at = ?3
         WHERE id = ?4",
        params![PaymentStatus::Paid.as_str(), payment_id, now_ts(), id],
    )?;
    Ok(count > 0)
}

/// Flips the one-shot confirmation flag; true only for the first caller.
pub fn claim_confirmation_notice(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET confirmation_sent = 1 WHERE id = ?1 AND confirmation_sent = 0",
        params![id],
    )?;
    Ok(count > 0)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let start_at: String = row.get(6)?;
    let end_at: String = row.get(7)?;
    let status: String = row.get(8)?;
    let payment_status: String = row.get(9)?;
    let payment_method: String = row.get(10)?;
    let created_at: String = row.get(17)?;
    let updated_at: String = row.get(18)?;

    Ok(Appointment {
        id: row.get(0)?,
        code: row.get(1)?,
        customer_id: row.get(2)?,
        service_id: row.get(3)?,
        room_id: row.get(4)?,
        employee_id: row.get(5)?,
        start_at: parse_ts(&start_at)?,
        end_at: parse_ts(&end_at)?,
        status: AppointmentStatus::parse(&status)
            .with_context(|| format!("unknown appointment status: {status}"))?,
        payment_status: PaymentStatus::parse(&payment_status),
        payment_method: PaymentMethod::parse(&payment_method),
        price: row.get(11)?,
        room_price: row.get(12)?,
        total_price: row.get(13)?,
        gateway_order_id: row.get(14)?,
        gateway_payment_id: row.get(15)?,
        created_by: row.get(16)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Availability Ledger ──

const LEDGER_COLUMNS: &str =
    "id, resource_kind, resource_id, start_at, end_at, status, appointment_id, created_at, updated_at";

pub fn insert_ledger_entry(conn: &Connection, entry: &LedgerEntry) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO ledger_entries (id, resource_kind, resource_id, start_at, end_at, status, appointment_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.id,
            entry.resource_kind.as_str(),
            entry.resource_id,
            format_ts(&entry.interval.start),
            format_ts(&entry.interval.end),
            entry.status.as_str(),
            entry.appointment_id,
            format_ts(&entry.created_at),
            format_ts(&entry.updated_at),
        ],
    )?;
    Ok(())
}

/// Booked entries for a resource that end after `window.start`; the caller
/// applies the exact overlap test.
pub fn get_booked_entries(
    conn: &Connection,
    kind: ResourceKind,
    resource_id: &str,
    window: &Interval,
) -> anyhow::Result<Vec<LedgerEntry>> {
    let sql = format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger_entries
         WHERE resource_kind = ?1 AND resource_id = ?2 AND status = 'booked' AND end_at > ?3
         ORDER BY start_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![kind.as_str(), resource_id, format_ts(&window.start)],
        |row| Ok(parse_ledger_row(row)),
    )?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

pub fn get_entries_for_appointment(
    conn: &Connection,
    appointment_id: &str,
) -> anyhow::Result<Vec<LedgerEntry>> {
    let sql = format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE appointment_id = ?1 ORDER BY created_at ASC, resource_kind DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![appointment_id], |row| Ok(parse_ledger_row(row)))?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

pub fn release_entries_for_appointment(
    conn: &Connection,
    appointment_id: &str,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE ledger_entries SET status = 'released', updated_at = ?1
         WHERE appointment_id = ?2 AND status = 'booked'",
        params![now_ts(), appointment_id],
    )?;
    Ok(count)
}

fn parse_ledger_row(row: &rusqlite::Row) -> anyhow::Result<LedgerEntry> {
    let kind: String = row.get(1)?;
    let start_at: String = row.get(3)?;
    let end_at: String = row.get(4)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(LedgerEntry {
        id: row.get(0)?,
        resource_kind: ResourceKind::parse(&kind),
        resource_id: row.get(2)?,
        interval: Interval::new(parse_ts(&start_at)?, parse_ts(&end_at)?),
        status: LedgerStatus::parse(&status),
        appointment_id: row.get(6)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Sequences ──

pub fn next_sequence(conn: &Connection, name: &str) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO sequences (name, value) VALUES (?1, 1)
         ON CONFLICT(name) DO UPDATE SET value = value + 1",
        params![name],
    )?;

    let value: i64 = conn.query_row(
        "SELECT value FROM sequences WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(value)
}
