//! Read/write access to the resource registry the booking engine consumes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use super::authenticate;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Branch, Caller, Category, Employee, Room, Service};
use crate::services::booking::MAX_DURATION_MINUTES;
use crate::state::AppState;

fn require_manager(caller: &Caller) -> Result<(), AppError> {
    if caller.role.can_manage_catalog() {
        Ok(())
    } else {
        Err(AppError::Forbidden("catalog changes require manager or admin".to_string()))
    }
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Turns SQLite constraint failures on insert into client errors.
fn insert_error(err: anyhow::Error, entity: &str, id: &str) -> AppError {
    use rusqlite::ffi;

    let constraint = match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(e.extended_code)
        }
        _ => None,
    };

    match constraint {
        Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE) => {
            AppError::Validation(format!("{entity} {id} already exists"))
        }
        Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
            AppError::Validation(format!("{entity} {id} references an unknown record"))
        }
        Some(_) => AppError::Validation(format!("{entity} {id} violates a constraint")),
        None => AppError::Internal(err),
    }
}

fn new_id(id: Option<String>) -> String {
    id.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

// ── Branches ──

#[derive(Deserialize)]
pub struct NewBranch {
    pub id: Option<String>,
    pub name: String,
}

pub async fn create_branch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewBranch>,
) -> Result<(StatusCode, Json<Branch>), AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    require_manager(&caller)?;

    let branch = Branch {
        id: new_id(body.id),
        name: required("name", &body.name)?,
    };
    {
        let db = state.db.lock().await;
        queries::create_branch(&db, &branch).map_err(|e| insert_error(e, "branch", &branch.id))?;
    }

    tracing::info!(branch_id = %branch.id, "branch created");
    Ok((StatusCode::CREATED, Json(branch)))
}

pub async fn list_branches(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Branch>>, AppError> {
    authenticate(&headers, &state.config.api_token)?;
    let db = state.db.lock().await;
    Ok(Json(queries::list_branches(&db)?))
}

// ── Categories ──

#[derive(Deserialize)]
pub struct NewCategory {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub requires_physical_resource: bool,
    pub required_role: String,
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    require_manager(&caller)?;

    let category = Category {
        id: new_id(body.id),
        name: required("name", &body.name)?,
        requires_physical_resource: body.requires_physical_resource,
        required_role: required("required_role", &body.required_role)?,
    };
    {
        let db = state.db.lock().await;
        queries::create_category(&db, &category).map_err(|e| insert_error(e, "category", &category.id))?;
    }

    tracing::info!(category_id = %category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Category>>, AppError> {
    authenticate(&headers, &state.config.api_token)?;
    let db = state.db.lock().await;
    Ok(Json(queries::list_categories(&db)?))
}

// ── Services ──

#[derive(Deserialize)]
pub struct NewService {
    pub id: Option<String>,
    pub name: String,
    pub category_id: String,
    pub duration_minutes: i64,
    #[serde(default)]
    pub price: i64,
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewService>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    require_manager(&caller)?;

    if body.duration_minutes <= 0 || body.duration_minutes > MAX_DURATION_MINUTES {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }
    if body.price < 0 {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }

    let service = Service {
        id: new_id(body.id),
        name: required("name", &body.name)?,
        category_id: required("category_id", &body.category_id)?,
        duration_minutes: body.duration_minutes,
        price: body.price,
    };
    {
        let db = state.db.lock().await;
        if queries::get_category(&db, &service.category_id)?.is_none() {
            return Err(AppError::Validation(format!(
                "unknown category: {}",
                service.category_id
            )));
        }
        queries::create_service(&db, &service).map_err(|e| insert_error(e, "service", &service.id))?;
    }

    tracing::info!(service_id = %service.id, "service created");
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Service>>, AppError> {
    authenticate(&headers, &state.config.api_token)?;
    let db = state.db.lock().await;
    Ok(Json(queries::list_services(&db)?))
}

// ── Rooms ──

fn default_capacity() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct NewRoom {
    pub id: Option<String>,
    pub name: String,
    pub room_type: String,
    pub branch_id: String,
    #[serde(default = "default_capacity")]
    pub capacity: i64,
    #[serde(default)]
    pub price: i64,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

pub async fn create_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewRoom>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    require_manager(&caller)?;

    if body.capacity <= 0 || body.price < 0 {
        return Err(AppError::Validation(
            "capacity must be positive and price not negative".to_string(),
        ));
    }

    let room = Room {
        id: new_id(body.id),
        name: required("name", &body.name)?,
        room_type: required("room_type", &body.room_type)?,
        branch_id: required("branch_id", &body.branch_id)?,
        capacity: body.capacity,
        price: body.price,
        is_available: body.is_available,
    };
    {
        let db = state.db.lock().await;
        if queries::get_branch(&db, &room.branch_id)?.is_none() {
            return Err(AppError::Validation(format!("unknown branch: {}", room.branch_id)));
        }
        queries::create_room(&db, &room).map_err(|e| insert_error(e, "room", &room.id))?;
    }

    tracing::info!(room_id = %room.id, room_type = %room.room_type, "room created");
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Room>>, AppError> {
    authenticate(&headers, &state.config.api_token)?;
    let db = state.db.lock().await;
    Ok(Json(queries::list_rooms(&db)?))
}

// ── Employees ──

#[derive(Deserialize)]
pub struct NewEmployee {
    pub id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub branch_id: String,
}

pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewEmployee>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    let caller = authenticate(&headers, &state.config.api_token)?;
    require_manager(&caller)?;

    let employee = Employee {
        id: new_id(body.id),
        name: required("name", &body.name)?,
        phone: body.phone.filter(|p| !p.trim().is_empty()),
        role: required("role", &body.role)?,
        branch_id: required("branch_id", &body.branch_id)?,
    };
    {
        let db = state.db.lock().await;
        if queries::get_branch(&db, &employee.branch_id)?.is_none() {
            return Err(AppError::Validation(format!(
                "unknown branch: {}",
                employee.branch_id
            )));
        }
        queries::create_employee(&db, &employee).map_err(|e| insert_error(e, "employee", &employee.id))?;
    }

    tracing::info!(employee_id = %employee.id, role = %employee.role, "employee created");
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Employee>>, AppError> {
    authenticate(&headers, &state.config.api_token)?;
    let db = state.db.lock().await;
    Ok(Json(queries::list_employees(&db)?))
}
